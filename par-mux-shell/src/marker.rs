//! Decoding of shell-integration OSC payloads into [`ShellMarker`]s.
//!
//! Supported families:
//! - `OSC 133 ; A|B|C|D[;exit]` (FinalTerm / iTerm2 command boundaries)
//! - `OSC 633 ; A|B|C|D[;exit] | E;<cmd> | P;Cwd=<path>` (VS Code flavour)
//! - `OSC 7 ; file://host/path` (working directory URI)
//! - `OSC 1337 ; CurrentDir=<path>` (iTerm2 working directory)
//!
//! Anything else, including malformed payloads of a known family, yields `None`.

use url::Url;

/// A decoded shell-integration marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMarker {
    /// Prompt is about to be drawn (A)
    PromptStart,
    /// Prompt finished, user input begins (B)
    PromptEnd,
    /// User pressed enter, command output begins (C)
    CommandStart,
    /// Command finished (D), with the exit status when the shell reported one
    CommandEnd { exit_code: Option<i32> },
    /// Explicit command line text (633;E)
    CommandLine(String),
    /// Current working directory report
    WorkingDirectory { path: String, host: Option<String> },
}

/// Decode one OSC payload (the bytes between `ESC ]` and the terminator).
pub fn parse_osc(payload: &[u8]) -> Option<ShellMarker> {
    let text = std::str::from_utf8(payload).ok()?;
    let (code, rest) = text.split_once(';').unwrap_or((text, ""));

    match code {
        "133" => parse_command_marker(rest, false),
        "633" => parse_command_marker(rest, true),
        "7" => parse_cwd_uri(rest),
        "1337" => rest
            .strip_prefix("CurrentDir=")
            .filter(|path| !path.is_empty())
            .map(|path| ShellMarker::WorkingDirectory {
                path: path.to_string(),
                host: None,
            }),
        _ => None,
    }
}

fn parse_command_marker(rest: &str, vscode: bool) -> Option<ShellMarker> {
    let mut fields = rest.split(';');
    let kind = fields.next()?;

    match kind {
        "A" => Some(ShellMarker::PromptStart),
        "B" => Some(ShellMarker::PromptEnd),
        "C" => Some(ShellMarker::CommandStart),
        "D" => {
            let exit_code = fields.next().and_then(|code| code.trim().parse::<i32>().ok());
            Some(ShellMarker::CommandEnd { exit_code })
        }
        "E" if vscode => {
            // Everything after "E;" is the command line; a trailing nonce field is optional
            let line = rest.strip_prefix("E;")?;
            let line = line.split(';').next().unwrap_or_default();
            Some(ShellMarker::CommandLine(unescape_vscode(line)))
        }
        "P" if vscode => {
            let property = fields.next()?;
            let path = property.strip_prefix("Cwd=")?;
            if path.is_empty() {
                return None;
            }
            Some(ShellMarker::WorkingDirectory {
                path: unescape_vscode(path),
                host: None,
            })
        }
        _ => None,
    }
}

/// Decode an OSC 7 `file://` URI into a local path and optional host.
fn parse_cwd_uri(uri: &str) -> Option<ShellMarker> {
    let parsed = Url::parse(uri).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty() && *h != "localhost")
        .map(str::to_string);

    // Re-root the path without the host so percent-decoding does not depend on
    // whether the reporting machine is this one.
    let local = Url::parse(&format!("file://{}", parsed.path())).ok()?;
    let path = local.to_file_path().ok()?;
    let path = path.to_string_lossy().to_string();
    if path.is_empty() {
        return None;
    }

    Some(ShellMarker::WorkingDirectory { path, host })
}

/// VS Code escapes `;` as `\x3b` and `\` as `\\` inside 633 payloads.
///
/// Escapes may encode the individual bytes of a multibyte character, so the
/// result is assembled as bytes and decoded once at the end.
fn unescape_vscode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(b'x') => {
                let hex = bytes
                    .get(i + 2..i + 4)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit));
                match hex
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte);
                        i += 4;
                    }
                    None => {
                        out.extend_from_slice(b"\\x");
                        i += 2;
                    }
                }
            }
            _ => {
                out.push(b'\\');
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_boundaries() {
        assert_eq!(parse_osc(b"133;A"), Some(ShellMarker::PromptStart));
        assert_eq!(parse_osc(b"133;A;cl=m"), Some(ShellMarker::PromptStart));
        assert_eq!(parse_osc(b"133;B"), Some(ShellMarker::PromptEnd));
        assert_eq!(parse_osc(b"133;C"), Some(ShellMarker::CommandStart));
        assert_eq!(
            parse_osc(b"133;D;1"),
            Some(ShellMarker::CommandEnd { exit_code: Some(1) })
        );
        assert_eq!(
            parse_osc(b"133;D"),
            Some(ShellMarker::CommandEnd { exit_code: None })
        );
    }

    #[test]
    fn test_non_numeric_exit_code_is_none() {
        assert_eq!(
            parse_osc(b"133;D;oops"),
            Some(ShellMarker::CommandEnd { exit_code: None })
        );
    }

    #[test]
    fn test_unknown_payloads_ignored() {
        assert_eq!(parse_osc(b"0;window title"), None);
        assert_eq!(parse_osc(b"133;Z"), None);
        assert_eq!(parse_osc(b"133"), None);
        assert_eq!(parse_osc(&[0xff, 0xfe]), None);
        // E is only meaningful in the 633 family
        assert_eq!(parse_osc(b"133;E;ls"), None);
    }

    #[test]
    fn test_osc7_with_host() {
        assert_eq!(
            parse_osc(b"7;file://devbox/home/user/my%20project"),
            Some(ShellMarker::WorkingDirectory {
                path: "/home/user/my project".to_string(),
                host: Some("devbox".to_string()),
            })
        );
    }

    #[test]
    fn test_osc7_without_host() {
        assert_eq!(
            parse_osc(b"7;file:///tmp"),
            Some(ShellMarker::WorkingDirectory {
                path: "/tmp".to_string(),
                host: None,
            })
        );
    }

    #[test]
    fn test_osc7_malformed_dropped() {
        assert_eq!(parse_osc(b"7;not a uri"), None);
        assert_eq!(parse_osc(b"7;http://example.com/tmp"), None);
        assert_eq!(parse_osc(b"7;"), None);
    }

    #[test]
    fn test_iterm_current_dir() {
        assert_eq!(
            parse_osc(b"1337;CurrentDir=/var/log"),
            Some(ShellMarker::WorkingDirectory {
                path: "/var/log".to_string(),
                host: None,
            })
        );
        assert_eq!(parse_osc(b"1337;CurrentDir="), None);
        assert_eq!(parse_osc(b"1337;SetMark"), None);
    }

    #[test]
    fn test_vscode_escaped_utf8_decodes_as_one_character() {
        // "é" is 0xC3 0xA9 in UTF-8
        assert_eq!(
            parse_osc(b"633;E;echo caf\\xc3\\xa9"),
            Some(ShellMarker::CommandLine("echo café".to_string()))
        );
        // Raw multibyte text passes through untouched
        assert_eq!(
            parse_osc("633;E;ls ~/Документы".as_bytes()),
            Some(ShellMarker::CommandLine("ls ~/Документы".to_string()))
        );
    }

    #[test]
    fn test_vscode_malformed_escapes_kept_literally() {
        assert_eq!(
            parse_osc(b"633;E;a\\xZZ b\\\\c\\"),
            Some(ShellMarker::CommandLine("a\\xZZ b\\c\\".to_string()))
        );
    }

    #[test]
    fn test_vscode_command_line() {
        assert_eq!(
            parse_osc(b"633;E;echo a\\x3bb;nonce123"),
            Some(ShellMarker::CommandLine("echo a;b".to_string()))
        );
        assert_eq!(
            parse_osc(b"633;P;Cwd=/srv/app"),
            Some(ShellMarker::WorkingDirectory {
                path: "/srv/app".to_string(),
                host: None,
            })
        );
        assert_eq!(
            parse_osc(b"633;D;130"),
            Some(ShellMarker::CommandEnd { exit_code: Some(130) })
        );
    }
}
