#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRisk {
    MultiStatement,
    Destructive(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAssessment {
    pub statement_count: usize,
    pub primary_keyword: Option<String>,
    pub risks: Vec<QueryRisk>,
}

impl QueryAssessment {
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        !self.risks.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        self.risks
            .iter()
            .map(|risk| match risk {
                QueryRisk::MultiStatement => "multiple statements".to_string(),
                QueryRisk::Destructive(keyword) => format!("{keyword} modifies stored data"),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Looks at the leading keyword of every statement in `query`. The text itself
/// is never rewritten; it is forwarded to the store as typed.
#[must_use]
pub fn assess_query(query: &str) -> QueryAssessment {
    let statements = split_statements(query);
    let mut risks = Vec::new();

    if statements.len() > 1 {
        risks.push(QueryRisk::MultiStatement);
    }

    let primary_keyword = statements.first().and_then(|statement| first_keyword(statement));
    for statement in &statements {
        if let Some(keyword) = first_keyword(statement) {
            if is_destructive_keyword(&keyword) {
                risks.push(QueryRisk::Destructive(keyword));
            }
        }
    }

    QueryAssessment {
        statement_count: statements.len(),
        primary_keyword,
        risks,
    }
}

fn split_statements(query: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars().peekable();

    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(ch) = chars.next() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
            }
            continue;
        }

        if in_block_comment {
            if ch == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }

        if !in_single_quote && !in_double_quote {
            if ch == '-' && chars.peek() == Some(&'-') {
                chars.next();
                in_line_comment = true;
                continue;
            }

            if ch == '/' && chars.peek() == Some(&'*') {
                chars.next();
                in_block_comment = true;
                continue;
            }
        }

        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                current.push(ch);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                current.push(ch);
            }
            ';' if !in_single_quote && !in_double_quote => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

fn first_keyword(statement: &str) -> Option<String> {
    statement
        .split_whitespace()
        .next()
        .map(str::to_ascii_uppercase)
}

fn is_destructive_keyword(keyword: &str) -> bool {
    matches!(
        keyword,
        "DROP" | "DELETE" | "TRUNCATE" | "UPDATE" | "ALTER" | "REPLACE"
    )
}
