use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use blockrooms::adapter::server::{run_server, ServerConfig};
use blockrooms::adapter::{ClientRequest, InboundCommand, OutboundMessage};
use blockrooms::engine::Registry;
use blockrooms::gateway::Gateway;
use blockrooms::types::Command;

type Lines = tokio::io::Lines<BufReader<OwnedReadHalf>>;

async fn spawn_server(
    cmd_capacity: usize,
) -> (
    SocketAddr,
    mpsc::Receiver<InboundCommand>,
    mpsc::UnboundedSender<OutboundMessage>,
) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_pending_commands: cmd_capacity,
    };
    let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(cmd_capacity);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();

    tokio::spawn(async move {
        let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx)).await;
    });

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");
    (addr, cmd_rx, out_tx)
}

async fn connect(addr: SocketAddr) -> (Lines, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("connect failed");
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn send_line(writer: &mut OwnedWriteHalf, line: &str) {
    writer.write_all(line.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();
}

async fn read_json(lines: &mut Lines) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timeout waiting for line")
        .expect("io error")
        .expect("expected line");
    serde_json::from_str(&line).expect("invalid json")
}

/// Skip lines until one of `msg_type` arrives.
async fn read_until(lines: &mut Lines, msg_type: &str) -> serde_json::Value {
    loop {
        let v = read_json(lines).await;
        if v["type"] == msg_type {
            return v;
        }
    }
}

async fn recv(cmd_rx: &mut mpsc::Receiver<InboundCommand>) -> InboundCommand {
    tokio::time::timeout(Duration::from_secs(2), cmd_rx.recv())
        .await
        .expect("timeout waiting for command")
        .expect("command channel closed")
}

#[tokio::test]
async fn requests_reach_the_game_loop_in_order() {
    let (addr, mut cmd_rx, _out_tx) = spawn_server(8).await;
    let (_lines, mut writer) = connect(addr).await;

    send_line(&mut writer, r#"{"type":"createGame","data":{"gameType":"multi"}}"#).await;
    send_line(
        &mut writer,
        r#"{"type":"executeCommands","data":["LEFT","FREEZE_OPPONENT","HARD_DROP"]}"#,
    )
    .await;

    let first = recv(&mut cmd_rx).await;
    assert_eq!(
        first.request,
        ClientRequest::CreateGame {
            game_type: "multi".to_string()
        }
    );
    let second = recv(&mut cmd_rx).await;
    assert_eq!(second.client_id, first.client_id);
    assert_eq!(
        second.request,
        ClientRequest::ExecuteCommands(vec![Command::Left, Command::HardDrop])
    );
}

#[tokio::test]
async fn malformed_line_gets_a_flash_and_connection_survives() {
    let (addr, mut cmd_rx, _out_tx) = spawn_server(8).await;
    let (mut lines, mut writer) = connect(addr).await;

    send_line(&mut writer, "{not json").await;
    let flash = read_json(&mut lines).await;
    assert_eq!(flash["type"], "addMessage");

    send_line(&mut writer, r#"{"type":"play"}"#).await;
    assert_eq!(recv(&mut cmd_rx).await.request, ClientRequest::Play);
}

#[tokio::test]
async fn disconnect_is_reported_as_a_request() {
    let (addr, mut cmd_rx, _out_tx) = spawn_server(8).await;
    let (lines, mut writer) = connect(addr).await;

    send_line(&mut writer, r#"{"type":"leaveGame"}"#).await;
    let leave = recv(&mut cmd_rx).await;
    assert_eq!(leave.request, ClientRequest::LeaveGame);

    drop(writer);
    drop(lines);
    let gone = recv(&mut cmd_rx).await;
    assert_eq!(gone.client_id, leave.client_id);
    assert_eq!(gone.request, ClientRequest::Disconnect);
}

/// Full loop: server, gateway and registry; two clients play a room.
#[tokio::test]
async fn two_clients_share_a_room() {
    let (addr, mut cmd_rx, out_tx) = spawn_server(16).await;
    let mut gateway = Gateway::new(Registry::default());

    let (mut lines_a, mut writer_a) = connect(addr).await;
    let (mut lines_b, mut writer_b) = connect(addr).await;

    // Drive the gateway for one request and deliver its output.
    macro_rules! pump {
        () => {{
            let inbound = recv(&mut cmd_rx).await;
            for msg in gateway.handle(inbound, 0) {
                out_tx.send(msg).unwrap();
            }
        }};
    }

    send_line(&mut writer_a, r#"{"type":"createGame","data":{"gameType":"multi"}}"#).await;
    pump!();
    let created = read_json(&mut lines_a).await;
    assert_eq!(created["type"], "gameCreated");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let join = format!(r#"{{"type":"joinGame","data":{{"id":"{id}"}}}}"#);
    send_line(&mut writer_a, &join).await;
    pump!();
    let joined = read_json(&mut lines_a).await;
    assert_eq!(joined["type"], "joinedGame");
    assert_eq!(joined["data"]["host"], true);
    assert_eq!(read_json(&mut lines_a).await["type"], "addPlayer");

    send_line(&mut writer_b, &join).await;
    pump!();
    let joined = read_json(&mut lines_b).await;
    assert_eq!(joined["data"]["host"], false);
    let roster = read_json(&mut lines_b).await;
    assert_eq!(roster["type"], "addPlayer");
    assert_eq!(roster["data"]["host"], true);
    let announced = read_json(&mut lines_a).await;
    assert_eq!(announced["type"], "addPlayer");
    assert_eq!(announced["data"]["id"], joined["data"]["playerId"]);

    send_line(&mut writer_a, r#"{"type":"play"}"#).await;
    pump!();
    send_line(&mut writer_b, r#"{"type":"play"}"#).await;
    pump!();
    assert_eq!(read_json(&mut lines_a).await["type"], "startGame");
    let start = read_until(&mut lines_b, "startGame").await;
    assert_eq!(start["data"]["id"], id.as_str());
    assert_eq!(read_json(&mut lines_b).await["type"], "draw");

    // Second room request from an unknown type is flashed, not fatal.
    send_line(&mut writer_b, r#"{"type":"createGame","data":{"gameType":"solo"}}"#).await;
    pump!();
    let flash = read_until(&mut lines_b, "addMessage").await;
    assert_eq!(flash["data"]["message"], "Unable to create game");
}
