use crate::error::PositionKeyError;

use shakmaty::{CastlingMode, Chess, EnPassantMode, fen::Fen};
use std::fmt;
use std::str::FromStr;

/// When the en-passant square is part of the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnPassantPolicy {
    /// Only when an en-passant capture is legal in the position.
    #[default]
    Legal,
    /// After every double pawn push, capturable or not.
    DoublePush,
}

impl EnPassantPolicy {
    pub fn parse(raw: &str) -> Result<Self, Box<dyn std::error::Error>> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "legal" => Ok(Self::Legal),
            "double_push" | "always" => Ok(Self::DoublePush),
            other => Err(format!(
                "Invalid en_passant value '{}'. Supported values: 'legal', 'double_push'.",
                other
            )
            .into()),
        }
    }

    fn mode(self) -> EnPassantMode {
        match self {
            Self::Legal => EnPassantMode::Legal,
            Self::DoublePush => EnPassantMode::Always,
        }
    }
}

/// Canonical identity of a position: the first four FEN fields.
///
/// Halfmove clock and fullmove number are left out, so transpositions and
/// repetitions reached at different move counts share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    placement: String,
    turn: char,
    castling: String,
    en_passant: Option<String>,
}

impl PositionKey {
    pub fn from_position(pos: &Chess, policy: EnPassantPolicy) -> Self {
        let fen = Fen::from_position(pos, policy.mode()).to_string();
        let mut fields = fen.split_ascii_whitespace();

        // shakmaty always renders all six fields.
        let placement = fields.next().unwrap_or_default().to_string();
        let turn = fields.next().and_then(|t| t.chars().next()).unwrap_or('w');
        let castling = fields.next().unwrap_or("-").to_string();
        let en_passant = fields.next().filter(|ep| *ep != "-").map(str::to_string);

        Self {
            placement,
            turn,
            castling,
            en_passant,
        }
    }

    /// Normalize a full or counter-less FEN.
    pub fn from_fen(fen: &str, policy: EnPassantPolicy) -> Result<Self, PositionKeyError> {
        let invalid = |reason: String| PositionKeyError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };

        let trimmed = fen.trim();
        let field_count = trimmed.split_ascii_whitespace().count();
        let full = match field_count {
            4 => format!("{trimmed} 0 1"),
            6 => trimmed.to_string(),
            n => return Err(invalid(format!("expected 4 or 6 fields, got {n}"))),
        };

        let parsed = Fen::from_ascii(full.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self::from_position(&pos, policy))
    }

    pub fn en_passant(&self) -> Option<&str> {
        self.en_passant.as_deref()
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.placement,
            self.turn,
            self.castling,
            self.en_passant.as_deref().unwrap_or("-")
        )
    }
}

impl FromStr for PositionKey {
    type Err = PositionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s, EnPassantPolicy::Legal)
    }
}
