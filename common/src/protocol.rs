use serde::{Deserialize, Serialize};

use crate::models::{CellValue, LeaderboardEntry, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickAction {
    Click,
    Flag,
}

/// Body of `POST /click`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ClickRequest {
    pub row: usize,
    pub col: usize,
    pub action: ClickAction,
}

impl ClickRequest {
    pub fn pos(&self) -> Pos {
        Pos::new(self.row, self.col)
    }
}

/// Answer to a `"click"` action. `won` and `time` are only present on the
/// winning move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResponse {
    pub success: bool,
    pub field: Vec<Vec<CellValue>>,
    pub revealed: Vec<Vec<bool>>,
    pub flags: Vec<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub won: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

/// Answer to a `"flag"` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagResponse {
    pub action: ClickAction,
    pub flags: Vec<Vec<bool>>,
    pub mines_remaining: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub won: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClickResponse {
    Reveal(RevealResponse),
    Flag(FlagResponse),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeResponse {
    pub time: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

/// Answer to `GET /`: the freshly dealt session plus the current leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    pub mines_remaining: i64,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_request_matches_browser_body() {
        let request: ClickRequest =
            serde_json::from_str(r#"{"row": 2, "col": 5, "action": "flag"}"#).unwrap();
        assert_eq!(request.pos(), Pos::new(2, 5));
        assert_eq!(request.action, ClickAction::Flag);
    }

    #[test]
    fn win_fields_are_omitted_until_won() {
        let response = FlagResponse {
            action: ClickAction::Flag,
            flags: vec![vec![true]],
            mines_remaining: -1,
            won: None,
            time: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["action"], "flag");
        assert_eq!(json["minesRemaining"], -1);
        assert!(json.get("won").is_none());
        assert!(json.get("time").is_none());
    }

    #[test]
    fn click_response_picks_variant_by_shape() {
        let reveal: ClickResponse = serde_json::from_str(
            r#"{"success": true, "field": [["1"]], "revealed": [[true]], "flags": [[false]], "won": true, "time": 12}"#,
        )
        .unwrap();
        assert!(matches!(reveal, ClickResponse::Reveal(RevealResponse { time: Some(12), .. })));

        let flag: ClickResponse = serde_json::from_str(
            r#"{"action": "flag", "flags": [[true]], "minesRemaining": 0}"#,
        )
        .unwrap();
        assert!(matches!(flag, ClickResponse::Flag(FlagResponse { mines_remaining: 0, .. })));
    }
}
