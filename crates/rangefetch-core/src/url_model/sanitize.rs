//! Filename sanitization for names taken from the network.

const NAME_MAX: usize = 255;

fn is_forbidden(c: char) -> bool {
    matches!(c, '\0' | '/' | '\\') || c.is_control()
}

/// Makes a server-supplied name safe to join onto the save directory.
///
/// Path separators, NUL and control characters each become `_`; every other
/// character is kept as sent. `.` and `..` yield an empty string. The result
/// is cut to 255 bytes on a char boundary.
pub fn sanitize_filename(name: &str) -> String {
    let out: String = name
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    if out == "." || out == ".." {
        return String::new();
    }

    let mut end = out.len().min(NAME_MAX);
    while !out.is_char_boundary(end) {
        end -= 1;
    }
    out[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_replaced() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("a\\b.txt"), "a_b.txt");
    }

    #[test]
    fn control_chars_replaced_one_for_one() {
        assert_eq!(sanitize_filename("file\x00\x01name.txt"), "file__name.txt");
    }

    #[test]
    fn legitimate_names_are_untouched() {
        for name in ["__init__.py", "my__data.csv", "_config.yml", ".bashrc", "my file.iso"] {
            assert_eq!(sanitize_filename(name), name);
        }
    }

    #[test]
    fn dot_names_are_rejected() {
        assert_eq!(sanitize_filename("."), "");
        assert_eq!(sanitize_filename(".."), "");
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let name = "é".repeat(200);
        let out = sanitize_filename(&name);
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
