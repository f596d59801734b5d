use crate::error::GameError;

use pgn_reader::{Nag, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use smallvec::SmallVec;
use std::ops::ControlFlow;

type PlyList = SmallVec<[Ply; 64]>;

/// One half-move of the mainline and the annotation text that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ply {
    pub san: SanPlus,
    pub annotation: String,
}

/// Single-pass iterator over the mainline plies of one game.
pub struct Plies {
    inner: smallvec::IntoIter<[Ply; 64]>,
}

impl Iterator for Plies {
    type Item = Ply;

    fn next(&mut self) -> Option<Ply> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Plies {}

pub struct ParsedGame {
    /// Value of the `FEN` tag when the game does not start from the standard position.
    pub setup_fen: Option<String>,
    pub plies: Plies,
}

#[derive(Default)]
struct SetupTags {
    fen: Option<String>,
}

/// Collects mainline SAN tokens with their trailing `{ ... }` comments.
/// Variations and NAGs are skipped.
#[derive(Default)]
struct PlyVisitor {
    fen: Option<String>,
}

impl Visitor for PlyVisitor {
    type Tags = SetupTags;
    type Movetext = PlyList;
    type Output = (Option<String>, PlyList);

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.fen = None;
        ControlFlow::Continue(SetupTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        if key == b"FEN" && tags.fen.is_none() {
            let fen = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
            if !fen.is_empty() {
                tags.fen = Some(fen);
            }
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        self.fen = tags.fen;
        ControlFlow::Continue(PlyList::new())
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        movetext.push(Ply {
            san,
            annotation: String::new(),
        });
        ControlFlow::Continue(())
    }

    fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        attach_comment(movetext, comment.as_bytes());
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        attach_comment(movetext, comment.as_bytes());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        (self.fen.take(), movetext)
    }
}

fn attach_comment(movetext: &mut PlyList, raw: &[u8]) {
    // Comments ahead of the first move annotate no ply.
    let Some(last) = movetext.last_mut() else {
        return;
    };

    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    if !last.annotation.is_empty() {
        last.annotation.push(' ');
    }
    last.annotation.push_str(text);
}

// Bytes that end a movetext token for the PGN reader.
fn is_token_end(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t'
            | b'\n'
            | b'\r'
            | b'{'
            | b'}'
            | b'('
            | b')'
            | b'!'
            | b'?'
            | b'$'
            | b';'
            | b'.'
            | b'*'
    )
}

/// Index just past the first `stop` at or after `from`.
fn skip_past(bytes: &[u8], from: usize, stop: u8) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == stop)
        .map_or(bytes.len(), |n| from + n + 1)
}

/// Index of the first `stop` at or after `from`.
fn skip_to(bytes: &[u8], from: usize, stop: u8) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == stop)
        .map_or(bytes.len(), |n| from + n)
}

/// Index just past a `[Name "value"]` tag starting at `from`.
fn skip_tag(bytes: &[u8], from: usize) -> usize {
    let mut i = from + 1;
    let mut quoted = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quoted => i += 1,
            b'"' => quoted = !quoted,
            b']' if !quoted => return i + 1,
            b'\n' => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Start of the movetext, after tag pairs and escape lines.
fn skip_tags(bytes: &[u8]) -> usize {
    let mut i = 0;
    loop {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        match bytes.get(i) {
            Some(b'[') => i = skip_tag(bytes, i),
            Some(b'%') => i = skip_to(bytes, i, b'\n'),
            _ => return i,
        }
    }
}

fn is_result(word: &[u8]) -> bool {
    matches!(word, b"1-0" | b"0-1" | b"1/2-1/2") || word == "½-½".as_bytes()
}

fn is_zero_castle(word: &[u8]) -> bool {
    let bare = word.strip_suffix(b"+").or_else(|| word.strip_suffix(b"#")).unwrap_or(word);
    matches!(bare, b"0-0" | b"0-0-0")
}

fn check_word(game_ref: &str, word: &[u8]) -> Result<(), GameError> {
    if is_result(word) || is_zero_castle(word) {
        return Ok(());
    }

    // Move numbers, possibly glued to the move (`12.Nf3` splits at the dot).
    let digits = word.iter().take_while(|b| b.is_ascii_digit()).count();
    let rest = &word[digits..];
    if rest.is_empty() || SanPlus::from_ascii(rest).is_ok() {
        return Ok(());
    }

    Err(GameError::malformed(
        game_ref,
        format!("unreadable move '{}'", String::from_utf8_lossy(word)),
    ))
}

/// Reject mainline tokens that are not moves, move numbers, NAGs or results.
///
/// The PGN reader skips such tokens without reporting them, which would shift
/// every later ply onto the wrong side. Variations are not checked. Scanning
/// stops where the reader ends the first game: a blank line or a new tag.
fn check_mainline_tokens(game_ref: &str, pgn: &str) -> Result<(), GameError> {
    let bytes = pgn.as_bytes();
    let mut i = skip_tags(bytes);
    let mut depth = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => i = skip_past(bytes, i, b'}'),
            b';' => i = skip_to(bytes, i, b'\n'),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b'\n' => match bytes.get(i + 1) {
                Some(b'\n' | b'[') => break,
                Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => break,
                Some(b'%') => i = skip_to(bytes, i + 1, b'\n'),
                _ => i += 1,
            },
            b if is_token_end(b) => i += 1,
            _ => {
                let end = bytes[i..]
                    .iter()
                    .position(|&b| is_token_end(b))
                    .map_or(bytes.len(), |n| i + n);
                if depth == 0 {
                    check_word(game_ref, &bytes[i..end])?;
                }
                i = end;
            }
        }
    }
    Ok(())
}

/// Parse one PGN game into its mainline plies.
///
/// Fails with [`GameError::MalformedGame`] when the text is empty, holds a
/// token that is not a move, the reader rejects it, or no game is found. Only
/// the first game of the text is read.
pub fn read_plies(game_ref: &str, pgn: &str) -> Result<ParsedGame, GameError> {
    if pgn.trim().is_empty() {
        return Err(GameError::malformed(game_ref, "empty game record"));
    }
    check_mainline_tokens(game_ref, pgn)?;

    let mut reader = Reader::new(pgn.as_bytes());
    let mut visitor = PlyVisitor::default();

    match reader.read_game(&mut visitor) {
        Ok(Some((setup_fen, plies))) => Ok(ParsedGame {
            setup_fen,
            plies: Plies {
                inner: plies.into_iter(),
            },
        }),
        Ok(None) => Err(GameError::malformed(game_ref, "no game found")),
        Err(e) => Err(GameError::malformed(game_ref, format!("read_game: {e}"))),
    }
}
