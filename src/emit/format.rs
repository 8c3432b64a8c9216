use super::{FormatError, Formatter};

/// Normalizes whitespace of generated source.
///
/// Trailing whitespace is stripped, runs of blank lines collapse to at most
/// two, and the text ends with exactly one newline. Text with unbalanced
/// brackets is rejected so the caller keeps it as rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceFormatter;

impl Formatter for WhitespaceFormatter {
    fn format(&self, text: &str) -> Result<String, FormatError> {
        check_brackets(text)?;

        let mut out = String::with_capacity(text.len());
        let mut blank_run = 0;
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 2 || out.is_empty() {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }

        let trimmed = out.trim_end_matches('\n').len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(out)
    }
}

/// Bracket balance outside of string literals.
fn check_brackets(text: &str) -> Result<(), FormatError> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for c in line.chars() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '#' => break,
                '(' | '[' | '{' => stack.push((c, line_no)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(FormatError {
                                line: line_no,
                                message: format!("unmatched '{c}'"),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }
    match stack.pop() {
        Some((open, line)) => Err(FormatError {
            line,
            message: format!("unclosed '{open}'"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_whitespace() {
        let text = "\n\nimport os   \n\n\n\n\nx = 1\t\n\n";
        assert_eq!(
            WhitespaceFormatter.format(text).unwrap(),
            "import os\n\n\nx = 1\n"
        );
    }

    #[test]
    fn test_adds_final_newline() {
        assert_eq!(WhitespaceFormatter.format("x = (1, 2)").unwrap(), "x = (1, 2)\n");
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let text = "s = \"(\"  # )\nt = ')'\n";
        assert!(WhitespaceFormatter.format(text).is_ok());
    }

    #[test]
    fn test_rejects_unbalanced_brackets() {
        let err = WhitespaceFormatter.format("x = Column(\ny = 2\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.message, "unclosed '('");

        let err = WhitespaceFormatter.format("x = 1)\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: unmatched ')'");
    }
}
