pub const SQLITE_SCHEMA_SQL: &str = include_str!("../../sql/sqlite_schema.sql");
pub const SCHEMA_VERSION: &str = "1.1.0";

/// Splits a script on `;` outside quoted literals.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ';' if !in_single_quote && !in_double_quote => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_statement(&mut statements, &current);

    statements
}

/// Drops `--` comment lines and keeps the statement if anything remains.
fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let sql = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = sql.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons_outside_literals() {
        let sql = "CREATE TABLE a (x TEXT DEFAULT 'a;b');\n-- note\nINSERT INTO a VALUES ('c');";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'a;b'"));
        assert_eq!(statements[1], "INSERT INTO a VALUES ('c')");
    }

    #[test]
    fn comment_only_chunks_are_skipped() {
        assert!(split_sql_statements("-- nothing here\n;\n  ").is_empty());
    }

    #[test]
    fn bundled_schema_has_every_table() {
        let statements = split_sql_statements(SQLITE_SCHEMA_SQL);
        for table in ["user_knowledge", "quiz_attempts", "roadmaps", "tutor_sessions", "tutor_messages"] {
            let quoted = format!("CREATE TABLE IF NOT EXISTS \"{table}\"");
            assert!(statements.iter().any(|s| s.starts_with(&quoted)), "missing {table}");
        }
        assert!(statements.iter().all(|s| !s.starts_with("--")));
    }
}
