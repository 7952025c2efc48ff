/// Single-quote a word for a POSIX shell
pub fn quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Quote a remote path, leaving a leading `~/` to expand to the remote `$HOME`
pub fn quote_path(path: &str) -> String {
    if path == "~" {
        return "\"$HOME\"".to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) => format!("\"$HOME\"/{}", quote(rest)),
        None => quote(path),
    }
}

/// Join a remote root and a `/`-separated relative path
pub fn join(root: &str, relative: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), relative)
}

/// Parent directory of a `/`-separated remote path
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        plain = { "a.txt", "'a.txt'" },
        space = { "my file", "'my file'" },
        single_quote = { "it's", r"'it'\''s'" },
    )]
    fn quotes_words(word: &str, expected: &str) {
        assert_eq!(quote(word), expected);
    }

    #[test]
    fn home_relative_paths_expand_remotely() {
        assert_eq!(quote_path("~/proj/x"), "\"$HOME\"/'proj/x'");
        assert_eq!(quote_path("~"), "\"$HOME\"");
        assert_eq!(quote_path("/work3/proj"), "'/work3/proj'");
    }

    #[test]
    fn joins_and_splits() {
        assert_eq!(join("~/proj/", "src/a.py"), "~/proj/src/a.py");
        assert_eq!(parent("~/proj/src/a.py"), "~/proj/src");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("a"), ".");
    }
}
