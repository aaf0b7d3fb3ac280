//! Parsing of `-Ss` search output
//!
//! Both backends print one header line per match:
//!
//! ```text
//! extra/vim 9.0.1-1 (1.9 MiB 3.8 MiB) [installed]
//!     Vi Improved, a highly configurable, improved version of the vi text editor
//! ```

/// Extract package names from search output
///
/// A line counts only if it has a `/` and the segment after the first `/`
/// starts with a whitespace-delimited token, which is the package name.
/// Indented description lines and anything malformed are skipped.
///
/// # Examples
///
/// ```
/// use fkinstall::orchestration::search::parse_search_output;
///
/// let names = parse_search_output("extra/vim 9.0-1 [installed]\n    Vi Improved\n");
/// assert_eq!(names, vec!["vim"]);
/// ```
pub fn parse_search_output(stdout: &str) -> Vec<String> {
    stdout.lines().filter_map(parse_line).map(str::to_string).collect()
}

fn parse_line(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    line.split('/').nth(1)?.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_repository_prefixed_line() {
        assert_eq!(parse_search_output("extra/vim 9.0-1 [installed]"), vec!["vim"]);
    }

    #[test]
    fn test_skips_line_without_slash() {
        assert!(parse_search_output("malformed-line-no-slash").is_empty());
    }

    #[test]
    fn test_skips_slash_without_token() {
        assert!(parse_search_output("extra/").is_empty());
        assert!(parse_search_output("extra/   ").is_empty());
    }

    #[test]
    fn test_skips_description_lines() {
        let output = "\
core/curl 8.5.0-1
    command line tool and library for transferring data with URLs (http/https)
aur/curl-git 8.5.0.r1-1 (+3 0.00)
    An URL retrieval utility and library (git version)
";
        assert_eq!(parse_search_output(output), vec!["curl", "curl-git"]);
    }

    #[test]
    fn test_uses_segment_after_first_slash() {
        assert_eq!(
            parse_search_output("extra/python-foo 1.0 (group/sub)"),
            vec!["python-foo"]
        );
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_search_output("").is_empty());
        assert!(parse_search_output("\n\n").is_empty());
    }
}
