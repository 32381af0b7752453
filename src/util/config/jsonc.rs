//! JSON with comments
//!
//! `tsconfig.json` allows `//` and `/* */` comments plus trailing commas.
//! They are stripped, keeping every other byte, and the rest goes to `serde_json`.

/// Remove comments and trailing commas from JSONC text
pub fn strip(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    // offset in `out` of a comma that is trailing if only whitespace and `}`/`]` follow
    let mut pending_comma: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                pending_comma = None;
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                out.extend_from_slice(&bytes[start..i]);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    // keep line breaks so serde_json positions stay meaningful
                    if bytes[i] == b'\n' {
                        out.push(b'\n');
                    }
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b',' => {
                pending_comma = Some(out.len());
                out.push(b',');
                i += 1;
            }
            b'}' | b']' => {
                if let Some(at) = pending_comma.take() {
                    out[at] = b' ';
                }
                out.push(bytes[i]);
                i += 1;
            }
            c => {
                if !c.is_ascii_whitespace() {
                    pending_comma = None;
                }
                out.push(c);
                i += 1;
            }
        }
    }
    // only whole comments and single ASCII commas were dropped, so the text stays UTF-8
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_comments() {
        let text = "{\n  // line\n  \"a\": 1, /* block\n */ \"b\": \"//not a comment\"\n}";
        let value: serde_json::Value = serde_json::from_str(&strip(text)).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], "//not a comment");
    }

    #[test]
    fn test_trailing_commas() {
        let text = r#"{ "include": ["src", "lib",], "x": { "y": 1, }, }"#;
        let value: serde_json::Value = serde_json::from_str(&strip(text)).unwrap();
        assert_eq!(value["include"][1], "lib");
        assert_eq!(value["x"]["y"], 1);
    }

    #[test]
    fn test_escaped_quotes() {
        let text = r#"{ "a": "say \"hi\", // ok" }"#;
        let value: serde_json::Value = serde_json::from_str(&strip(text)).unwrap();
        assert_eq!(value["a"], "say \"hi\", // ok");
    }
}
