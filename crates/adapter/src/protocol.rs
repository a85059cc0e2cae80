//! Protocol module - JSON envelopes exchanged with game clients
//!
//! Every line on the wire is one `{"type": <name>, "data": <payload>}`
//! object. Inbound names are the client requests; outbound names are the
//! room bus topics plus a few replies to room-management requests.

use serde::{Deserialize, Serialize};

use crate::core::{Event, Piece};
use crate::types::{
    Command, GridRows, MatchSummary, PlayerId, PlayerStats, RoomId, Standing,
};

// ============== Client -> Server ==============

/// What a client can ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    CreateGame { game_type: String },
    JoinGame { id: RoomId },
    LeaveGame,
    /// Ready to start
    Play,
    /// Recognized commands only, in the order sent
    ExecuteCommands(Vec<Command>),
    /// Synthesized by the server when the connection ends
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Request(ClientRequest),
    /// Well-formed envelope with a type nobody handles
    Unknown(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data")]
enum InboundMessage {
    #[serde(rename = "createGame")]
    CreateGame {
        #[serde(rename = "gameType")]
        game_type: String,
    },
    #[serde(rename = "joinGame")]
    JoinGame { id: String },
    #[serde(rename = "leaveGame")]
    LeaveGame,
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "executeCommands")]
    ExecuteCommands(Vec<String>),
}

/// Parse one inbound line.
///
/// Unknown command ids inside `executeCommands` (power-ups this server does
/// not implement) are dropped rather than failing the whole batch.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<InboundMessage>(json) {
        Ok(msg) => Ok(ParsedMessage::Request(match msg {
            InboundMessage::CreateGame { game_type } => ClientRequest::CreateGame { game_type },
            InboundMessage::JoinGame { id } => ClientRequest::JoinGame { id },
            InboundMessage::LeaveGame => ClientRequest::LeaveGame,
            InboundMessage::Play => ClientRequest::Play,
            InboundMessage::ExecuteCommands(ids) => ClientRequest::ExecuteCommands(
                ids.iter().filter_map(|id| Command::from_str(id)).collect(),
            ),
        })),
        Err(e) => {
            #[derive(Deserialize)]
            struct TypeOnly {
                #[serde(rename = "type")]
                msg_type: String,
            }
            let TypeOnly { msg_type } = serde_json::from_str::<TypeOnly>(json)?;
            match msg_type.as_str() {
                "createGame" | "joinGame" | "leaveGame" | "play" | "executeCommands" => Err(e),
                _ => Ok(ParsedMessage::Unknown(msg_type)),
            }
        }
    }
}

// ============== Server -> Client ==============

#[derive(Serialize)]
struct Envelope<'a, T> {
    #[serde(rename = "type")]
    msg_type: &'a str,
    data: T,
}

fn envelope<T: Serialize>(msg_type: &str, data: T) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope { msg_type, data })
}

#[derive(Debug, Clone, Serialize)]
pub struct PieceData {
    #[serde(rename = "type")]
    pub kind: u8,
    pub rotation: usize,
    pub x: i8,
    pub y: i8,
}

impl From<Piece> for PieceData {
    fn from(piece: Piece) -> Self {
        Self {
            kind: piece.kind.id(),
            rotation: piece.rotation,
            x: piece.x,
            y: piece.y,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingData {
    pub place: u32,
    pub id: PlayerId,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

impl From<&Standing> for StandingData {
    fn from(s: &Standing) -> Self {
        Self {
            place: s.place,
            id: s.player_id,
            score: s.stats.score,
            level: s.stats.level,
            lines: s.stats.lines,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawData {
    id: PlayerId,
    piece: PieceData,
    ghost_y: i8,
    next: Option<u8>,
}

#[derive(Serialize)]
struct GridData<'a> {
    id: PlayerId,
    grid: &'a GridRows,
}

#[derive(Serialize)]
struct ScoreData {
    id: PlayerId,
    score: u32,
    level: u32,
    lines: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RankingData<'a> {
    id: &'a str,
    game_type: &'a str,
    ranking: Vec<StandingData>,
}

fn score_data(id: PlayerId, stats: PlayerStats) -> ScoreData {
    ScoreData {
        id,
        score: stats.score,
        level: stats.level,
        lines: stats.lines,
    }
}

fn ranking(room: &str, summary: &MatchSummary) -> serde_json::Result<String> {
    envelope(
        "gameOver",
        RankingData {
            id: room,
            game_type: summary.game_type.as_str(),
            ranking: summary.standings.iter().map(StandingData::from).collect(),
        },
    )
}

/// Wire form of a room bus event. `room` fills in payloads that name the room.
pub fn encode_event(room: &str, event: &Event) -> serde_json::Result<String> {
    use serde_json::json;

    match event {
        Event::AddPlayer { player_id, host } => {
            envelope("addPlayer", json!({ "id": player_id, "host": host }))
        }
        Event::RemovePlayer { player_id } => envelope("removePlayer", json!({ "id": player_id })),
        Event::StartGame => envelope("startGame", json!({ "id": room })),
        Event::Draw {
            player_id,
            piece,
            ghost_y,
            next,
        } => envelope(
            "draw",
            DrawData {
                id: *player_id,
                piece: PieceData::from(*piece),
                ghost_y: *ghost_y,
                next: next.map(|k| k.id()),
            },
        ),
        Event::BoardChange { player_id, grid } => envelope(
            "boardChange",
            GridData {
                id: *player_id,
                grid,
            },
        ),
        Event::ClearLines { player_id, count } => {
            envelope("clearLines", json!({ "id": player_id, "count": count }))
        }
        Event::UpdateScore { player_id, stats } => {
            envelope("updateScore", score_data(*player_id, *stats))
        }
        Event::NeedPieces {
            player_id,
            sets_seen,
        } => envelope("needPieces", json!({ "id": player_id, "sets": sets_seen })),
        Event::PiecesAdded { sets } => envelope("piecesAdded", json!({ "sets": sets })),
        Event::GameOver { player_id, grid } => envelope(
            "gameOver",
            GridData {
                id: *player_id,
                grid,
            },
        ),
        Event::MatchOver { summary } => ranking(room, summary),
        Event::AddMessage { text, .. } => add_message(text),
    }
}

/// Flash notice
pub fn add_message(text: &str) -> serde_json::Result<String> {
    envelope("addMessage", serde_json::json!({ "message": text }))
}

pub fn game_created(id: &str) -> serde_json::Result<String> {
    envelope("gameCreated", serde_json::json!({ "id": id }))
}

pub fn joined_game(id: &str, player_id: PlayerId, host: bool) -> serde_json::Result<String> {
    envelope(
        "joinedGame",
        serde_json::json!({ "id": id, "playerId": player_id, "host": host }),
    )
}
