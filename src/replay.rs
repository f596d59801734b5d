use crate::aggregate::{GamePositions, PositionStore};
use crate::board::BoardSimulator;
use crate::clock::{self, ClockTracker};
use crate::error::GameError;
use crate::log;
use crate::movetext;
use crate::position_key::{EnPassantPolicy, PositionKey};
use crate::types::GameRecord;
use crate::video;

use std::time::Duration;

/// Replay one game and collect its observations.
///
/// Each ply is recorded against the position *before* the move. The video
/// reference of a ply includes the mover's thinking time on that ply. Any
/// error discards everything collected so far.
pub fn replay_game(
    record: &GameRecord,
    en_passant: EnPassantPolicy,
) -> Result<GamePositions, GameError> {
    let parsed = movetext::read_plies(&record.game_ref, &record.pgn)?;
    let mut board = match parsed.setup_fen.as_deref() {
        Some(fen) => BoardSimulator::from_fen(&record.game_ref, fen)?,
        None => BoardSimulator::new(),
    };

    let mut clocks = ClockTracker::new();
    let mut elapsed = Duration::ZERO;
    let mut positions = GamePositions::new();

    for (idx, ply) in parsed.plies.enumerate() {
        let mover = board.turn();
        let key = PositionKey::from_position(board.snapshot(), en_passant);

        elapsed += clocks.advance(mover, clock::extract(&ply.annotation));
        let seek = video::seek_seconds(record.base_offset, elapsed);
        let video_ref = video::with_seek(&record.video_url, seek);

        let san = board.apply(&record.game_ref, idx + 1, &ply.san)?;
        positions.record(key, san, mover == record.subject, video_ref);
    }

    Ok(positions)
}

/// Games merged vs. games skipped during one ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub replayed: usize,
    pub skipped: usize,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.replayed + self.skipped
    }
}

/// Replay each record in order and merge every finished game into `store`.
///
/// Records that failed upstream arrive as `Err` and are counted as skipped.
/// A failing game never reaches the store.
pub fn ingest<S, I>(store: &mut S, records: I, en_passant: EnPassantPolicy) -> IngestSummary
where
    S: PositionStore + ?Sized,
    I: IntoIterator<Item = Result<GameRecord, GameError>>,
{
    let mut summary = IngestSummary::default();

    for record in records {
        let outcome = record.and_then(|record| replay_game(&record, en_passant));
        match outcome {
            Ok(positions) => {
                store.merge_game(positions);
                summary.replayed += 1;
            }
            Err(err) => {
                log::warn(format!("skipping game ({}): {}", err.kind(), err));
                summary.skipped += 1;
            }
        }
    }

    log::info(format!(
        "ingested {} games: {} replayed, {} skipped",
        summary.total(),
        summary.replayed,
        summary.skipped
    ));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{PositionIndex, PositionStore};
    use shakmaty::Color;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -";

    fn record(game_ref: &str, pgn: &str, subject: Color, url: &str, base: u64) -> GameRecord {
        GameRecord {
            game_ref: game_ref.to_string(),
            pgn: pgn.to_string(),
            subject,
            video_url: url.to_string(),
            base_offset: base,
        }
    }

    fn key(fen: &str) -> PositionKey {
        fen.parse().unwrap()
    }

    fn replay(record: &GameRecord) -> GamePositions {
        replay_game(record, EnPassantPolicy::Legal).unwrap()
    }

    #[test]
    fn test_first_move_without_clocks_uses_base_offset() {
        let game = replay(&record(
            "g1",
            "1. e4 c5 *",
            Color::White,
            "https://youtu.be/aaaaaaaaaaa?t=30",
            30,
        ));

        let start = game.get(&key(START)).unwrap();
        assert!(start.moves_by_subject.contains("e4"));
        assert!(start.moves_by_other.is_empty());
        assert!(start.videos.contains("https://youtu.be/aaaaaaaaaaa?t=30"));

        let after_e4 = game.get(&key(AFTER_E4)).unwrap();
        assert!(after_e4.moves_by_other.contains("c5"));
        assert!(after_e4.videos.contains("https://youtu.be/aaaaaaaaaaa?t=30"));
    }

    #[test]
    fn test_subject_elapsed_time_moves_the_seek_point() {
        let pgn = "1. e4 {[%clk 0:05:00]} c5 {[%clk 0:05:00]} \
                   2. Nf3 {[%clk 0:04:40]} d6 {[%clk 0:04:58]} *";
        let game = replay(&record(
            "g2",
            pgn,
            Color::White,
            "https://example/watch?t=50",
            50,
        ));

        let after_c5 = game
            .get(&key("rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -"))
            .unwrap();
        assert!(after_c5.moves_by_subject.contains("Nf3"));
        let videos: Vec<&String> = after_c5.videos.iter().collect();
        assert_eq!(videos, vec!["https://example/watch?t=70"]);

        // Black spent two seconds on d6 after twenty for Nf3.
        let after_nf3 = game
            .get(&key("rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq -"))
            .unwrap();
        assert!(after_nf3.videos.contains("https://example/watch?t=72"));
        assert!(after_nf3.moves_by_other.contains("d6"));
    }

    #[test]
    fn test_subject_as_black_records_black_moves() {
        let game = replay(&record(
            "g3",
            "1. d4 Nf6 *",
            Color::Black,
            "https://youtu.be/aaaaaaaaaaa",
            0,
        ));
        let start = game.get(&key(START)).unwrap();
        assert!(start.moves_by_other.contains("d4"));
        assert!(start.videos.contains("https://youtu.be/aaaaaaaaaaa?t=0"));
    }

    #[test]
    fn test_illegal_move_aborts_game() {
        let err = replay_game(
            &record("g4", "1. e4 e5 2. Ke3 *", Color::White, "v", 0),
            EnPassantPolicy::Legal,
        )
        .err()
        .unwrap();
        assert!(matches!(err, GameError::IllegalMove { ply: 3, .. }));
    }

    #[test]
    fn test_missing_clock_restarts_elapsed_time() {
        let pgn = "1. e4 {[%clk 0:05:00]} e5 {[%clk 0:05:00]} 2. Nf3 Nc6 {[%clk 0:04:59]} \
                   3. d4 {[%clk 0:04:10]} exd4 {[%clk 0:04:58]} *";
        let game = replay(&record("g6", pgn, Color::White, "https://example/watch?t=0", 0));

        // White's 0:04:10 follows a ply without a reading, so it adds nothing.
        let before_d4 = game
            .get(&key("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq -"))
            .unwrap();
        assert!(before_d4.videos.contains("https://example/watch?t=1"));
    }

    #[test]
    fn test_unreadable_token_keeps_game_out_of_index() {
        let broken = record("b", "1. e4 e5 2. Nf3 Zq9 Nc6 3. Bb5 *", Color::White, "vb", 0);
        let mut index = PositionIndex::new();
        let summary = ingest(&mut index, [Ok(broken)], EnPassantPolicy::Legal);

        assert_eq!(summary, IngestSummary { replayed: 0, skipped: 1 });
        assert!(index.is_empty());
    }

    #[test]
    fn test_illegal_fifteenth_move_leaves_no_positions_behind() {
        let breyer = "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 6. Re1 b5 \
                      7. Bb3 d6 8. c3 O-O 9. h3 Nb8 10. d4 Nbd7 11. Nbd2 Bb7 12. Bc2 Re8 \
                      13. Nf1 Bf8 14. Ng3 g6 15. Ke3 *";
        let broken = record("breyer", breyer, Color::White, "va", 0);
        let clean = record("clean", "1. d4 d5 *", Color::White, "vb", 0);

        let mut index = PositionIndex::new();
        let summary = ingest(&mut index, [Ok(broken), Ok(clean)], EnPassantPolicy::Legal);

        assert_eq!(summary, IngestSummary { replayed: 1, skipped: 1 });
        assert!(index.get(&key(AFTER_E4)).is_none());
        let start = index.get(&key(START)).unwrap();
        assert_eq!(start.moves_by_subject.iter().collect::<Vec<_>>(), vec!["d4"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_transposition_merges_within_game_and_across_games() {
        let a = record("a", "1. Nf3 Nf6 2. g3 g6 3. Bg2 *", Color::White, "va", 0);
        let b = record("b", "1. g3 g6 2. Nf3 Nf6 3. c4 *", Color::White, "vb", 0);

        let mut index = PositionIndex::new();
        ingest(&mut index, [Ok(a), Ok(b)], EnPassantPolicy::Legal);

        let shared = key("rnbqkb1r/pppppp1p/5np1/8/8/5NP1/PPPPPP1P/RNBQKB1R w KQkq -");
        let entry = index.get(&shared).unwrap();
        assert_eq!(
            entry.moves_by_subject.iter().collect::<Vec<_>>(),
            vec!["Bg2", "c4"]
        );
        assert_eq!(entry.videos.len(), 2);
    }

    #[test]
    fn test_reprocessing_a_batch_changes_nothing() {
        let batch = || {
            vec![
                Ok(record("a", "1. e4 e5 2. Nf3 Nc6 *", Color::White, "va", 0)),
                Ok(record("b", "1. d4 d5 2. c4 e6 *", Color::Black, "vb", 12)),
                Err(GameError::malformed("c", "game was not found upstream")),
            ]
        };

        let mut index = PositionIndex::new();
        let first = ingest(&mut index, batch(), EnPassantPolicy::Legal);
        let once = index.clone();
        let second = ingest(&mut index, batch(), EnPassantPolicy::Legal);

        assert_eq!(first, IngestSummary { replayed: 2, skipped: 1 });
        assert_eq!(second, first);
        assert_eq!(index, once);
    }

    #[test]
    fn test_fen_setup_game_replays_from_tagged_position() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"]

1. e4 Kd7 *"#;
        let game = replay(&record("g5", pgn, Color::White, "v", 0));
        let start = game.get(&key("4k3/8/8/8/8/8/4P3/4K3 w - -")).unwrap();
        assert!(start.moves_by_subject.contains("e4"));
        assert_eq!(game.len(), 2);
    }
}
