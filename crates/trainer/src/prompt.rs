//! Prompt text for the opponent and commentary requests.

use drill_core::pgn::format_movetext;
use drill_core::{Board, Color, NotatedMove};

pub const MOVE_SYSTEM_PROMPT: &str = r#"You are a world-class chess grandmaster playing a game against a student.

Your style:
- Universal player, comfortable in any type of position
- Patient and precise, you squeeze wins out of equal positions
- You prefer moves that keep pressure on your opponent

Before answering, consider a few candidate moves and pick the one that fits your style.

IMPORTANT: reply with exactly this JSON object and nothing else:
{
  "move": "e4",
  "thinking": "Your reasoning, in the first person",
  "evaluation": "Equal / Slight advantage White / Slight advantage Black / ...",
  "confidence": 85
}

The "move" field must contain ONLY the short algebraic notation of your move (e.g. "e4", "Nf3", "O-O", "Bxc6")."#;

pub const COMMENTARY_SYSTEM_PROMPT: &str =
    "You are a chess grandmaster commenting on a game you are playing.";

fn movetext(moves: &[NotatedMove]) -> String {
    let notations: Vec<&str> = moves.iter().map(|m| m.notation.as_str()).collect();
    format_movetext(&notations)
}

/// User prompt asking for the next move.
pub fn move_prompt(board: &Board, moves: &[NotatedMove], side: Color) -> String {
    let history = movetext(moves);
    let history = if history.is_empty() {
        "(game start)".to_string()
    } else {
        history
    };
    format!(
        "Current position:\n{}\n\nMove history: {}\n\nIt's {side}'s turn. You are playing as {side}.\nWhat is your move? Remember to respond in the exact JSON format.",
        board.to_diagram(),
        history,
    )
}

/// User prompt asking for a short reaction to the opponent's last move.
pub fn commentary_prompt(board: &Board, moves: &[NotatedMove], last_move: &str) -> String {
    format!(
        "Current position after {last_move}:\n{}\n\nMove history: {}\n\nBriefly react to your opponent's last move and name the key ideas in this position. Answer in the first person, in 2-3 sentences.",
        board.to_diagram(),
        movetext(moves),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::Move;

    #[test]
    fn test_move_prompt_at_game_start() {
        let prompt = move_prompt(&Board::standard(), &[], Color::White);
        assert!(prompt.contains("(game start)"));
        assert!(prompt.contains("It's White's turn"));
        assert!(prompt.contains("  a b c d e f g h"));
    }

    #[test]
    fn test_move_prompt_lists_history() {
        let e4 = NotatedMove::new(
            Move::new("e2".parse().unwrap(), "e4".parse().unwrap()),
            "e4",
        );
        let prompt = move_prompt(&Board::standard(), &[e4.clone()], Color::Black);
        assert!(prompt.contains("Move history: 1. e4"));
        assert!(prompt.contains("You are playing as Black"));

        let comment = commentary_prompt(&Board::standard(), &[e4], "e4");
        assert!(comment.starts_with("Current position after e4:"));
    }
}
