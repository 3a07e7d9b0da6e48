//! Line-oriented interactive loop shared by the chat-style commands.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::AppError;

/// Words that end an interactive session (English and Thai).
pub const QUIT_WORDS: &[&str] = &["quit", "exit", "ออก", "หยุด"];

pub fn is_quit(line: &str, quit_words: &[&str]) -> bool {
    let line = line.trim().to_lowercase();
    quit_words.iter().any(|w| line == *w)
}

/// Read lines from `reader` until EOF or a quit word, answering each
/// non-blank line with `handle`. Returns the number of lines handled.
pub async fn run_loop<R, W, F>(
    reader: R,
    mut writer: W,
    prompt: &str,
    quit_words: &[&str],
    mut handle: F,
) -> Result<usize, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: AsyncFnMut(&str) -> String,
{
    let mut lines = reader.lines();
    let mut handled = 0;
    loop {
        writer.write_all(prompt.as_bytes()).await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if is_quit(line, quit_words) {
            break;
        }
        if line.is_empty() {
            writer.write_all(b"Please enter some text.\n").await?;
            continue;
        }

        let answer = handle(line).await;
        writer.write_all(format!("{answer}\n").as_bytes()).await?;
        handled += 1;
    }
    writer.write_all(b"Goodbye!\n").await?;
    writer.flush().await?;
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_words_match_case_insensitively() {
        assert!(is_quit(" QUIT ", QUIT_WORDS));
        assert!(is_quit("หยุด", QUIT_WORDS));
        assert!(!is_quit("quit now", QUIT_WORDS));
    }

    #[tokio::test]
    async fn loop_stops_at_quit_and_skips_blank_lines() {
        let input: &[u8] = "hello\n\n  world \nออก\nnever\n".as_bytes();
        let mut out = Vec::new();
        let handled = run_loop(input, &mut out, "> ", QUIT_WORDS, async |line: &str| line.to_uppercase())
            .await
            .unwrap();
        assert_eq!(handled, 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("HELLO\n"));
        assert!(text.contains("WORLD\n"));
        assert!(text.contains("Please enter some text."));
        assert!(!text.contains("NEVER"));
    }

    #[tokio::test]
    async fn loop_ends_at_eof() {
        let input: &[u8] = b"one\n";
        let mut out = Vec::new();
        let handled = run_loop(input, &mut out, "", QUIT_WORDS, async |l: &str| l.to_string()).await.unwrap();
        assert_eq!(handled, 1);
    }
}
