//! Line input and single-key prompts on top of the decoder

use std::io::Write;

use super::{is_printable, Key, RawInput, KEY_BACKSPACE, KEY_DEL, KEY_ENTER};
use crate::error::DoorResult;
use crate::fd::ByteSource;
use crate::keys::KeyCode;

impl<S: ByteSource> RawInput<S> {
    /// Read an edited line, echoing to `out`
    ///
    /// Enter finishes the line; Backspace/DEL remove the character left of
    /// the cursor; Left, Right, Home and End move within the line. Returns
    /// `None` if the stream closes first.
    pub fn read_line<W: Write>(
        &mut self,
        out: &mut W,
        prompt: &str,
        max_len: usize,
        echo: bool,
    ) -> DoorResult<Option<String>> {
        if !prompt.is_empty() {
            out.write_all(prompt.as_bytes())?;
            out.flush()?;
        }

        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = 0usize;
        let prompt_len = prompt.chars().count();

        loop {
            let Some(key) = self.get_key(None)? else {
                if self.eof_seen() {
                    return Ok(None);
                }
                continue;
            };

            match key {
                Key::Char(KEY_ENTER) => {
                    if echo {
                        out.write_all(b"\r\n")?;
                        out.flush()?;
                    }
                    return Ok(Some(buffer.iter().map(|&b| char::from(b)).collect()));
                }
                Key::Char(KEY_BACKSPACE | KEY_DEL) => {
                    if cursor == 0 {
                        continue;
                    }
                    buffer.remove(cursor - 1);
                    cursor -= 1;
                    if echo {
                        out.write_all(b"\r")?;
                        out.write_all(prompt.as_bytes())?;
                        out.write_all(&buffer)?;
                        out.write_all(b" \x1b[K\r")?;
                        out.write_all(prompt.as_bytes())?;
                        out.write_all(&buffer)?;
                        if cursor < buffer.len() {
                            write!(out, "\x1b[{}G", prompt_len + cursor + 1)?;
                        }
                    }
                }
                Key::Named(KeyCode::Left) if cursor > 0 => {
                    cursor -= 1;
                    if echo {
                        out.write_all(b"\x1b[D")?;
                    }
                }
                Key::Named(KeyCode::Right) if cursor < buffer.len() => {
                    cursor += 1;
                    if echo {
                        out.write_all(b"\x1b[C")?;
                    }
                }
                Key::Named(KeyCode::Home) => {
                    cursor = 0;
                    if echo {
                        out.write_all(b"\r")?;
                        out.write_all(prompt.as_bytes())?;
                    }
                }
                Key::Named(KeyCode::End) => {
                    cursor = buffer.len();
                    if echo {
                        write!(out, "\x1b[{}G", prompt_len + buffer.len() + 1)?;
                    }
                }
                Key::Char(b) if is_printable(b) && buffer.len() < max_len => {
                    buffer.insert(cursor, b);
                    cursor += 1;
                    if echo {
                        out.write_all(&buffer[cursor - 1..])?;
                        if cursor < buffer.len() {
                            write!(out, "\x1b[{}D", buffer.len() - cursor)?;
                        }
                    }
                }
                _ => {}
            }
            if echo {
                out.flush()?;
            }
        }
    }

    /// Wait for a key matching one of `options`, case-insensitively
    ///
    /// Enter matches a `\r` or `\n` option. Returns the option character as
    /// written in `options`, or `None` if the stream closes first.
    pub fn get_answer(&mut self, options: &str) -> DoorResult<Option<char>> {
        loop {
            let Some(key) = self.get_key(None)? else {
                if self.eof_seen() {
                    return Ok(None);
                }
                continue;
            };
            if let Some(choice) = match_option(options, key) {
                return Ok(Some(choice));
            }
        }
    }
}

fn match_option(options: &str, key: Key) -> Option<char> {
    let Key::Char(b) = key else {
        return None;
    };
    if b == KEY_ENTER {
        return options.chars().find(|c| matches!(c, '\r' | '\n'));
    }
    let pressed = char::from(b).to_ascii_lowercase();
    options.chars().find(|c| c.to_ascii_lowercase() == pressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::fd::ReadOutcome;
    use crate::input::StreamState;

    /// Serves one fixed buffer, then reports end-of-stream
    struct Once(Option<Vec<u8>>);

    impl ByteSource for Once {
        fn read_timeout(
            &mut self,
            buf: &mut [u8],
            _timeout: Option<Duration>,
        ) -> DoorResult<ReadOutcome> {
            match self.0.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(ReadOutcome::Data(data.len()))
                }
                None => Ok(ReadOutcome::Closed),
            }
        }
    }

    fn input(bytes: &[u8]) -> RawInput<Once> {
        let state = Rc::new(RefCell::new(StreamState::new(-1)));
        RawInput::with_source(state, Once(Some(bytes.to_vec())))
    }

    #[test]
    fn test_read_line_basic() {
        let mut inp = input(b"hello\r");
        let mut out = Vec::new();
        let line = inp.read_line(&mut out, "> ", 80, true).expect("read");
        assert_eq!(line.as_deref(), Some("hello"));
        assert!(out.starts_with(b"> "));
        assert!(out.ends_with(b"\r\n"));
    }

    #[test]
    fn test_read_line_editing() {
        // type "abd", left, backspace, "c", end, "!"
        let mut inp = input(b"abd\x1b[D\x7fc\x1b[K!\r");
        let mut out = Vec::new();
        let line = inp.read_line(&mut out, "", 80, false).expect("read");
        assert_eq!(line.as_deref(), Some("acd!"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_line_max_len() {
        let mut inp = input(b"abcdef\r");
        let mut out = Vec::new();
        let line = inp.read_line(&mut out, "", 3, false).expect("read");
        assert_eq!(line.as_deref(), Some("abc"));
    }

    #[test]
    fn test_read_line_eof() {
        let mut inp = input(b"abc");
        let mut out = Vec::new();
        assert_eq!(inp.read_line(&mut out, "", 80, false).expect("read"), None);
    }

    #[test]
    fn test_get_answer() {
        let mut inp = input(b"xqY");
        assert_eq!(inp.get_answer("yn").expect("read"), Some('y'));

        let mut inp = input(b"\r");
        assert_eq!(inp.get_answer("yn\r").expect("read"), Some('\r'));

        let mut inp = input(b"zz");
        assert_eq!(inp.get_answer("yn").expect("read"), None);
    }
}
