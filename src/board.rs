use crate::error::GameError;

use shakmaty::{CastlingMode, Chess, Color, Position, fen::Fen, san::SanPlus};

/// Owns the board for one replay. Never shared between games.
pub struct BoardSimulator {
    position: Chess,
}

impl BoardSimulator {
    pub fn new() -> Self {
        Self {
            position: Chess::default(),
        }
    }

    /// Start from a `FEN` tag. An unreadable or impossible setup makes the
    /// whole record malformed.
    pub fn from_fen(game_ref: &str, fen: &str) -> Result<Self, GameError> {
        let parsed = Fen::from_ascii(fen.as_bytes())
            .map_err(|e| GameError::malformed(game_ref, format!("FEN tag '{fen}': {e}")))?;
        let position = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| GameError::malformed(game_ref, format!("FEN tag '{fen}': {e}")))?;
        Ok(Self { position })
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    pub fn snapshot(&self) -> &Chess {
        &self.position
    }

    /// Play `san` and return it re-rendered from the position, so the same
    /// move always gets the same disambiguation and check suffix.
    pub fn apply(
        &mut self,
        game_ref: &str,
        ply: usize,
        san: &SanPlus,
    ) -> Result<String, GameError> {
        let m = san
            .san
            .to_move(&self.position)
            .map_err(|e| GameError::IllegalMove {
                game_ref: game_ref.to_string(),
                ply,
                san: san.to_string(),
                reason: e.to_string(),
            })?;

        Ok(SanPlus::from_move_and_play_unchecked(&mut self.position, m).to_string())
    }
}

impl Default for BoardSimulator {
    fn default() -> Self {
        Self::new()
    }
}
