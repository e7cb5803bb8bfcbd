use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use listen_ftp::pipeline::{RELATIONSHIP_SUCCESS, attributes};
use listen_ftp::{FtpServer, MemorySessionFactory, ServerConfig, SessionFactorySlot};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    server: FtpServer,
    addr: SocketAddr,
    slot: SessionFactorySlot,
}

fn test_config() -> ServerConfig {
    ServerConfig {
        control_port: 0,
        data_port_min: 0,
        data_port_max: 0,
        ..ServerConfig::default()
    }
}

async fn start_server(username: Option<&str>, password: Option<&str>) -> TestServer {
    start_with_config(ServerConfig {
        username: username.map(str::to_string),
        password: password.map(str::to_string),
        ..test_config()
    })
    .await
}

async fn start_with_config(config: ServerConfig) -> TestServer {
    let slot = SessionFactorySlot::new();
    let mut server = FtpServer::from_config(config, slot.clone()).unwrap();
    let addr = server.start().await.unwrap();
    TestServer { server, addr, slot }
}

async fn start_anonymous_with_pipeline() -> (TestServer, Arc<MemorySessionFactory>) {
    let server = start_server(None, None).await;
    let factory = Arc::new(MemorySessionFactory::new());
    server.slot.set(factory.clone());
    (server, factory)
}

// Minimal control-connection client
struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl FtpClient {
    /// Connects without consuming the greeting.
    async fn open(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::open(addr).await;
        let (code, _) = client.read_reply().await;
        assert_eq!(code, 220);
        client
    }

    async fn login_anonymous(addr: SocketAddr) -> Self {
        let mut client = Self::connect(addr).await;
        assert_eq!(client.send("USER anonymous").await.0, 331);
        assert_eq!(client.send("PASS guest@example.com").await.0, 230);
        client
    }

    /// Reads one reply, following `code-` continuation lines.
    async fn read_reply(&mut self) -> (u16, String) {
        let mut text = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            let read = timeout(REPLY_TIMEOUT, self.reader.read_line(&mut line))
                .await
                .expect("reply timed out")
                .unwrap();
            assert!(read > 0, "control connection closed");
            text.push_str(&line);

            let bytes = line.as_bytes();
            if bytes.len() >= 4 && bytes[..3].iter().all(u8::is_ascii_digit) && bytes[3] == b' ' {
                let code = line[..3].parse().unwrap();
                return (code, text);
            }
        }
    }

    async fn send(&mut self, command: &str) -> (u16, String) {
        self.send_only(command).await;
        self.read_reply().await
    }

    async fn send_only(&mut self, command: &str) {
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .unwrap();
    }

    /// Sends PASV and connects to the advertised data port.
    async fn passive_data(&mut self) -> TcpStream {
        let (code, text) = self.send("PASV").await;
        assert_eq!(code, 227);
        let start = text.find('(').unwrap() + 1;
        let end = text.find(')').unwrap();
        let numbers: Vec<u16> = text[start..end]
            .split(',')
            .map(|n| n.trim().parse().unwrap())
            .collect();
        let port = numbers[4] * 256 + numbers[5];
        TcpStream::connect(("127.0.0.1", port)).await.unwrap()
    }
}

#[tokio::test]
async fn test_stor_commits_upload_with_attributes() {
    let (server, factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;

    assert_eq!(client.send("MKD A").await.0, 257);
    assert_eq!(client.send("CWD A").await.0, 250);

    let mut data = client.passive_data().await;
    client.send_only("STOR f.txt").await;
    assert_eq!(client.read_reply().await.0, 150);

    let payload: Vec<u8> = (0..100u8).collect();
    data.write_all(&payload).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);

    let (code, text) = client.read_reply().await;
    assert_eq!(code, 226);
    assert!(text.contains("100 bytes"));

    let committed = factory.committed_to(RELATIONSHIP_SUCCESS);
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].content, payload);
    assert_eq!(committed[0].attribute(attributes::FILENAME), Some("f.txt"));
    assert_eq!(committed[0].attribute(attributes::PATH), Some("/A/"));
}

#[tokio::test]
async fn test_stor_waits_for_late_pipeline() {
    let server = start_server(None, None).await;
    let mut client = FtpClient::login_anonymous(server.addr).await;

    let mut data = client.passive_data().await;
    client.send_only("STOR early.bin").await;
    assert_eq!(client.read_reply().await.0, 150);
    data.write_all(b"before the pipeline").await.unwrap();
    data.shutdown().await.unwrap();

    let factory = Arc::new(MemorySessionFactory::new());
    let slot = server.slot.clone();
    let late = factory.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        slot.set(late);
    });

    assert_eq!(client.read_reply().await.0, 226);
    assert_eq!(factory.committed()[0].content, b"before the pipeline");
}

#[tokio::test]
async fn test_stor_without_pasv_is_503() {
    let (server, factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;

    let (code, text) = client.send("STOR f.txt").await;
    assert_eq!(code, 503);
    assert!(text.contains("PORT or PASV must be issued first"));
    assert!(factory.committed().is_empty());
    assert_eq!(factory.session_count(), 0);
}

#[tokio::test]
async fn test_directory_commands() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;

    assert_eq!(client.send("MKD /A").await.0, 257);
    assert_eq!(client.send("MKD /A/B").await.0, 257);
    let (code, text) = client.send("PWD").await;
    assert_eq!(code, 257);
    assert!(text.contains("\"/\""));

    assert_eq!(client.send("CWD /A/B").await.0, 250);
    assert!(client.send("PWD").await.1.contains("\"/A/B\""));
    assert_eq!(client.send("CDUP").await.0, 250);
    assert!(client.send("PWD").await.1.contains("\"/A\""));

    assert_eq!(client.send("CWD /missing").await.0, 550);
    assert_eq!(client.send("SIZE B").await.0, 213);
    assert_eq!(client.send("RMD /A").await.0, 250);
    assert_eq!(client.send("RMD /A").await.0, 550);
    assert!(!server.server.tree().exists(&listen_ftp::storage::VirtualPath::parse("/A/B")));
}

#[tokio::test]
async fn test_list_over_passive_connection() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;
    client.send("MKD beta").await;
    client.send("MKD alpha").await;

    let mut data = client.passive_data().await;
    client.send_only("NLST").await;
    assert_eq!(client.read_reply().await.0, 150);

    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert_eq!(listing, "alpha\r\nbeta\r\n");
    assert_eq!(client.read_reply().await.0, 226);
}

#[tokio::test]
async fn test_mlsd_over_passive_connection() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;
    client.send("MKD /A").await;
    client.send("MKD /A/inner").await;

    let mut data = client.passive_data().await;
    client.send_only("MLSD /A").await;
    assert_eq!(client.read_reply().await.0, 150);

    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert!(listing.starts_with("type=dir;size=0;modify="));
    assert!(listing.ends_with("; inner\r\n"));
    assert_eq!(client.read_reply().await.0, 226);
}

#[tokio::test]
async fn test_list_over_eprt_connection() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;
    client.send("MKD alpha").await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (code, _) = client.send(&format!("EPRT |1|127.0.0.1|{}|", port)).await;
    assert_eq!(code, 200);

    client.send_only("NLST").await;
    assert_eq!(client.read_reply().await.0, 150);
    let (mut data, _) = timeout(REPLY_TIMEOUT, listener.accept()).await.unwrap().unwrap();
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert_eq!(listing, "alpha\r\n");
    assert_eq!(client.read_reply().await.0, 226);
}

#[tokio::test]
async fn test_max_clients_rejects_extra_connection() {
    let server = start_with_config(ServerConfig {
        max_clients: 1,
        ..test_config()
    })
    .await;
    let mut first = FtpClient::connect(server.addr).await;

    let mut second = FtpClient::open(server.addr).await;
    let (code, text) = second.read_reply().await;
    assert_eq!(code, 421);
    assert!(text.contains("Too many connections."));

    assert_eq!(first.send("NOOP").await.0, 200);
}

#[tokio::test]
async fn test_overlong_command_is_rejected() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;

    let overlong = format!("MKD {}", "x".repeat(600));
    let (code, text) = client.send(&overlong).await;
    assert_eq!(code, 500);
    assert_eq!(text, "500 Command too long.\r\n");
    assert_eq!(server.server.tree().size(), 1);

    assert_eq!(client.send("NOOP").await.0, 200);
}

#[tokio::test]
async fn test_help_and_rejected_verbs() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;

    let (code, text) = client.send("HELP").await;
    assert_eq!(code, 214);
    assert!(text.starts_with("214-The following commands are supported."));
    assert!(text.contains("STOR"));
    assert!(!text.contains("RETR"));

    let (code, text) = client.send("HELP STOR").await;
    assert_eq!(code, 214);
    assert!(text.contains("Syntax: STOR <sp> <pathname>"));

    let (code, text) = client.send("RETR f.txt").await;
    assert_eq!(code, 502);
    assert!(text.contains("Operation (RETR) not supported."));
    assert_eq!(client.send("DELE f.txt").await.0, 502);
    assert_eq!(client.send("RNFR a").await.0, 502);
    assert_eq!(client.send("BOGUS").await.0, 500);
}

#[tokio::test]
async fn test_commands_require_login() {
    let (server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::connect(server.addr).await;

    assert_eq!(client.send("MKD A").await.0, 530);
    assert_eq!(client.send("PASV").await.0, 530);
    assert_eq!(client.send("HELP").await.0, 214);
    assert_eq!(client.send("QUIT").await.0, 221);
}

#[tokio::test]
async fn test_single_user_credentials() {
    let server = start_server(Some("alice"), Some("secret")).await;
    let mut client = FtpClient::connect(server.addr).await;

    assert_eq!(client.send("USER anonymous").await.0, 530);
    assert_eq!(client.send("USER alice").await.0, 331);
    assert_eq!(client.send("PASS wrong").await.0, 530);
    assert_eq!(client.send("USER alice").await.0, 331);
    assert_eq!(client.send("PASS secret").await.0, 230);
}

#[tokio::test]
async fn test_stop_closes_idle_connections() {
    let (mut server, _factory) = start_anonymous_with_pipeline().await;
    let mut client = FtpClient::login_anonymous(server.addr).await;
    client.send("MKD A").await;

    server.server.stop().await;

    assert_eq!(client.read_reply().await.0, 421);
    assert!(server.server.is_stopped());
    assert_eq!(server.server.tree().size(), 1);
    assert!(TcpStream::connect(server.addr).await.is_err());
}
