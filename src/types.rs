use shakmaty::Color;

/// One game ready for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Identifies the game in diagnostics (usually its chess.com URL).
    pub game_ref: String,
    /// PGN text; per-move annotations carry `[%clk ...]` readings.
    pub pgn: String,
    /// Colour played by the tracked player.
    pub subject: Color,
    /// Video in which the game is played.
    pub video_url: String,
    /// Seconds into the video at which the game starts.
    pub base_offset: u64,
}
