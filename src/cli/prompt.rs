use anyhow::Result;
use colored::*;
use std::io::{self, Write};

/// Whether `answer` confirms the action. Permanent deletion needs the
/// whole word `yes`; moving to Trash accepts `y` too.
pub fn accepts(answer: &str, permanent: bool) -> bool {
    let answer = answer.trim();
    if permanent {
        answer == "yes"
    } else {
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    }
}

/// Ask on stdout and read one line from stdin
pub fn confirm(question: &str, permanent: bool) -> Result<bool> {
    let hint = if permanent { "type 'yes' to confirm" } else { "y/N" };
    print!("\n  {} {} [{}] ", "?".cyan().bold(), question, hint);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(accepts(&input, permanent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trash_accepts_short_answer() {
        assert!(accepts("y\n", false));
        assert!(accepts("YES", false));
        assert!(!accepts("", false));
        assert!(!accepts("n", false));
    }

    #[test]
    fn test_permanent_needs_full_word() {
        assert!(accepts("yes\n", true));
        assert!(!accepts("y", true));
        assert!(!accepts("YES", true));
    }
}
