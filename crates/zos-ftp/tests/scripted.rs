//! Scripted-server tests: a loopback TCP server plays a fixed reply
//! script while a real session drives the protocol, and the test
//! asserts on the observed command sequence and transferred bytes.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use zos_ftp::{CancelToken, DialOptions, FtpError, FtpSession, ReplyCode, TransferType};

// ---------------------------------------------------------------------------
// Script server
// ---------------------------------------------------------------------------

enum Payload {
    Bytes(Vec<u8>),
    /// Send back whatever the last `RecvData` step captured.
    Replay,
}

enum Step {
    /// Read one command, then send `reply` verbatim after `delay`.
    Cmd { reply: String, delay: Duration },
    /// Read one command (PASV), open a data listener, and reply 227
    /// with its port tuple.
    Pasv,
    /// Read one command, send `preliminary`, write `payload` to the
    /// accepted data connection, close it, then send `terminal`.
    SendData {
        preliminary: String,
        payload: Payload,
        terminal: String,
    },
    /// Read one command, send `preliminary`, read the accepted data
    /// connection to EOF into the capture buffer, then send
    /// `terminal`.
    RecvData {
        preliminary: String,
        terminal: String,
    },
}

fn cmd(reply: &str) -> Step {
    Step::Cmd {
        reply: reply.to_string(),
        delay: Duration::ZERO,
    }
}

fn cmd_delayed(reply: &str, delay: Duration) -> Step {
    Step::Cmd {
        reply: reply.to_string(),
        delay,
    }
}

fn send_data(preliminary: &str, payload: Payload, terminal: &str) -> Step {
    Step::SendData {
        preliminary: preliminary.to_string(),
        payload,
        terminal: terminal.to_string(),
    }
}

fn recv_data(preliminary: &str, terminal: &str) -> Step {
    Step::RecvData {
        preliminary: preliminary.to_string(),
        terminal: terminal.to_string(),
    }
}

struct ScriptServer {
    addr: String,
    commands: Arc<Mutex<Vec<String>>>,
    captured: Arc<Mutex<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptServer {
    fn start(script: Vec<Step>) -> ScriptServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::new(Mutex::new(Vec::new()));

        let thread_commands = commands.clone();
        let thread_captured = captured.clone();
        let handle =
            thread::spawn(move || run_script(listener, script, thread_commands, thread_captured));

        ScriptServer {
            addr,
            commands,
            captured,
            handle: Some(handle),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn captured(&self) -> Vec<u8> {
        self.captured.lock().unwrap().clone()
    }

    /// Wait for the server thread; call after the session is closed
    /// or dropped so the control socket has reached EOF.
    fn finish(mut self) {
        self.handle.take().unwrap().join().unwrap();
    }
}

fn run_script(
    listener: TcpListener,
    script: Vec<Step>,
    commands: Arc<Mutex<Vec<String>>>,
    captured: Arc<Mutex<Vec<u8>>>,
) {
    let (control, _) = listener.accept().unwrap();
    let mut writer = control.try_clone().unwrap();
    let mut reader = BufReader::new(control);
    writer.write_all(b"220 ready\r\n").unwrap();

    let mut data_listener: Option<TcpListener> = None;

    for step in script {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        commands.lock().unwrap().push(line.trim_end().to_string());

        match step {
            Step::Cmd { reply, delay } => {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                writer.write_all(reply.as_bytes()).unwrap();
            }
            Step::Pasv => {
                let l = TcpListener::bind("127.0.0.1:0").unwrap();
                let port = l.local_addr().unwrap().port();
                data_listener = Some(l);
                let reply = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{}).\r\n",
                    port >> 8,
                    port & 0xff
                );
                writer.write_all(reply.as_bytes()).unwrap();
            }
            Step::SendData {
                preliminary,
                payload,
                terminal,
            } => {
                writer.write_all(preliminary.as_bytes()).unwrap();
                let (mut conn, _) = data_listener
                    .take()
                    .expect("no data listener for send step")
                    .accept()
                    .unwrap();
                let bytes = match payload {
                    Payload::Bytes(b) => b,
                    Payload::Replay => captured.lock().unwrap().clone(),
                };
                conn.write_all(&bytes).unwrap();
                drop(conn);
                writer.write_all(terminal.as_bytes()).unwrap();
            }
            Step::RecvData {
                preliminary,
                terminal,
            } => {
                writer.write_all(preliminary.as_bytes()).unwrap();
                let (mut conn, _) = data_listener
                    .take()
                    .expect("no data listener for recv step")
                    .accept()
                    .unwrap();
                let mut buf = Vec::new();
                let _ = conn.read_to_end(&mut buf);
                let mut captured = captured.lock().unwrap();
                captured.clear();
                captured.extend_from_slice(&buf);
                drop(conn);
                writer.write_all(terminal.as_bytes()).unwrap();
            }
        }
    }
}

fn open(server: &ScriptServer) -> FtpSession {
    FtpSession::open(
        &server.addr,
        DialOptions::new().with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn login_script(syst_reply: &str) -> Vec<Step> {
    vec![
        cmd("331 need pwd\r\n"),
        cmd("230 ok\r\n"),
        cmd("227 =(0,0,0,0,4,1)\r\n"),
        cmd("200 ok\r\n"), // TYPE I
        cmd("200 ok\r\n"), // SITE SBSENDEOL
        cmd("200 ok\r\n"), // SITE MBSENDEOL
        cmd(syst_reply),
    ]
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn happy_login() {
    let server = ScriptServer::start(login_script(
        "215 MVS is the operating system of this server.\r\n",
    ));
    let session = open(&server);

    session.login("ibmuser", "secret").unwrap();
    assert_eq!(session.system().unwrap(), "MVS");
    assert_eq!(session.user(), "IBMUSER");

    let commands = server.commands();
    assert_eq!(commands[0], "USER ibmuser");
    assert_eq!(commands[1], "PASS secret");
    assert_eq!(commands[2], "PASV");
    assert_eq!(commands[3].trim(), "TYPE I");
    assert!(commands[4].starts_with("SITE SBSENDEOL="));
    assert!(commands[5].starts_with("SITE MBSENDEOL="));
    assert!(commands[6].starts_with("SYST"));

    session.close().unwrap();
    server.finish();
}

#[test]
fn login_rejects_non_mvs() {
    let server = ScriptServer::start(login_script("215 UNIX is the remote system\r\n"));
    let session = open(&server);

    let err = session.login("ibmuser", "secret").unwrap_err();
    assert!(err.to_string().contains("unsupported system type"));

    drop(session);
    server.finish();
}

// ---------------------------------------------------------------------------
// Replies and status
// ---------------------------------------------------------------------------

#[test]
fn multi_line_stat_payload() {
    let server = ScriptServer::start(vec![cmd("211-first\r\n211-second\r\n211 end\r\n")]);
    let session = open(&server);

    assert_eq!(session.stat().unwrap(), "first\nsecond\nend");

    drop(session);
    server.finish();
}

#[test]
fn passive_port_arithmetic() {
    let server =
        ScriptServer::start(vec![cmd("227 Entering Passive Mode (10,1,2,3,78,90).\r\n")]);
    let session = open(&server);

    assert_eq!(session.set_passive_mode().unwrap(), 20058);

    drop(session);
    server.finish();
}

#[test]
fn xstat_strips_status_trailer() {
    let server = ScriptServer::start(vec![cmd(
        "211-FileType JES\r\n211 *** end of status ***\r\n",
    )]);
    let session = open(&server);

    assert_eq!(session.xstat("FILEtype").unwrap(), "FileType JES");

    drop(session);
    server.finish();
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[test]
fn empty_passive_list() {
    let server = ScriptServer::start(vec![
        Step::Pasv,
        send_data("125 list started\r\n", Payload::Bytes(vec![]), "250 done\r\n"),
    ]);
    let session = open(&server);

    let lines = session.list("*").unwrap();
    assert!(lines.is_empty());
    assert_eq!(session.open_data_connections(), 0);

    drop(session);
    server.finish();
}

const DATASET_HEADER: &str = "Volume Unit    Referred Ext Used Recfm Lrecl BlkSz Dsorg Dsname";
const DATASET_ROW: &str =
    "VOL001 3390  2024/01/15   1   15    FB    80 27920 PS   'USER.TEST.DATA'";

#[test]
fn scoped_filetype_around_dataset_listing() {
    let listing = format!("{DATASET_HEADER}\r\n{DATASET_ROW}\r\n");
    let server = ScriptServer::start(vec![
        cmd("211 FileType SEQ *** end of status ***\r\n"),
        cmd("200 ok\r\n"),
        Step::Pasv,
        send_data(
            "125 list started\r\n",
            Payload::Bytes(listing.into_bytes()),
            "250 done\r\n",
        ),
        cmd("200 ok\r\n"),
    ]);
    let session = open(&server);

    let datasets = session.list_datasets("'USER.*'").unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name(), "USER.TEST.DATA");
    assert_eq!(datasets[0].lrecl.value(), 80);

    let commands = server.commands();
    assert!(commands[0].to_uppercase().starts_with("XSTA (FILETYPE"));
    assert_eq!(commands[1], "SITE FILETYPE=SEQ");
    assert_eq!(commands[2], "PASV");
    assert!(commands[3].starts_with("LIST"));
    assert_eq!(commands[4], "SITE FILETYPE=SEQ");
    assert!(commands.iter().all(|c| !c.contains("FILETYPE=JES")));

    drop(session);
    server.finish();
}

#[test]
fn scoped_filetype_restores_after_failed_listing() {
    let server = ScriptServer::start(vec![
        cmd("211 FileType SEQ *** end of status ***\r\n"),
        cmd("200 ok\r\n"),
        Step::Pasv,
        cmd("550 no list for you\r\n"),
        cmd("200 ok\r\n"),
    ]);
    let session = open(&server);

    let err = session.list_datasets("'USER.*'").unwrap_err();
    assert!(matches!(err, FtpError::UnexpectedReply { got: 550, .. }));

    let commands = server.commands();
    assert_eq!(commands[4], "SITE FILETYPE=SEQ");
    assert_eq!(session.open_data_connections(), 0);

    drop(session);
    server.finish();
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

#[test]
fn image_store_then_retrieve_round_trips() {
    let payload = b"\x00\x01binary\xffdata".to_vec();
    let server = ScriptServer::start(vec![
        cmd("200 ok\r\n"), // TYPE I
        Step::Pasv,
        recv_data("125 storing\r\n", "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
        cmd("200 ok\r\n"), // TYPE I
        Step::Pasv,
        send_data("150 sending\r\n", Payload::Replay, "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
    ]);
    let session = open(&server);

    let (stored, _) = session
        .store_reader("'USER.BIN'", &mut payload.as_slice(), TransferType::Image)
        .unwrap();
    assert_eq!(stored, payload.len() as u64);
    assert_eq!(server.captured(), payload);

    let mut retrieved = Vec::new();
    session
        .retrieve_writer("'USER.BIN'", &mut retrieved, TransferType::Image)
        .unwrap();
    assert_eq!(retrieved, payload);
    assert_eq!(session.current_type(), TransferType::Ascii);
    assert_eq!(session.open_data_connections(), 0);

    drop(session);
    server.finish();
}

#[test]
fn ascii_store_terminates_every_record() {
    let server = ScriptServer::start(vec![
        cmd("200 ok\r\n"), // TYPE A
        Step::Pasv,
        recv_data("125 storing\r\n", "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
    ]);
    let session = open(&server);

    let source = "line1\nline2";
    let (bytes, _) = session
        .store_reader("'USER.TEXT'", &mut source.as_bytes(), TransferType::Ascii)
        .unwrap();

    assert_eq!(server.captured(), b"line1\r\nline2\r\n");
    assert_eq!(bytes, 14);

    drop(session);
    server.finish();
}

#[test]
fn put_and_get_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("upload.bin");
    std::fs::write(&src_path, b"local payload").unwrap();

    let server = ScriptServer::start(vec![
        cmd("200 ok\r\n"), // TYPE I
        Step::Pasv,
        recv_data("125 storing\r\n", "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
        cmd("200 ok\r\n"), // TYPE I
        Step::Pasv,
        send_data("150 sending\r\n", Payload::Replay, "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
    ]);
    let session = open(&server);

    let sent = session
        .put(&src_path, "'USER.UP'", TransferType::Image, &[])
        .unwrap();
    assert_eq!(sent, 13);
    assert_eq!(server.captured(), b"local payload");

    let dest_path = dir.path().join("download.bin");
    let got = session
        .get("'USER.UP'", &dest_path, TransferType::Image)
        .unwrap();
    assert_eq!(got, 13);
    assert_eq!(std::fs::read(&dest_path).unwrap(), b"local payload");

    drop(session);
    server.finish();
}

#[test]
fn retrieve_with_offset_issues_rest() {
    let server = ScriptServer::start(vec![
        cmd("200 ok\r\n"), // TYPE I
        Step::Pasv,
        cmd("350 restarting\r\n"),
        send_data("125 sending\r\n", Payload::Bytes(b"tail".to_vec()), "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
    ]);
    let session = open(&server);

    let mut out = Vec::new();
    session
        .retrieve_writer_at("'USER.BIG'", &mut out, TransferType::Image, Some(5))
        .unwrap();
    assert_eq!(out, b"tail");
    assert!(server.commands().iter().any(|c| c == "REST 5"));

    drop(session);
    server.finish();
}

#[test]
fn set_type_twice_is_observably_stable() {
    let server = ScriptServer::start(vec![cmd("200 ok\r\n"), cmd("200 ok\r\n")]);
    let session = open(&server);

    session.set_type(TransferType::Ascii).unwrap();
    session.set_type(TransferType::Ascii).unwrap();
    assert_eq!(session.current_type(), TransferType::Ascii);

    let commands = server.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].trim(), "TYPE A");
    assert_eq!(commands[1].trim(), "TYPE A");

    drop(session);
    server.finish();
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn close_is_idempotent_and_gates_commands() {
    let server = ScriptServer::start(vec![]);
    let session = open(&server);

    session.close().unwrap();
    session.close().unwrap();
    assert!(session.is_closed());

    let reply = session
        .send_command(ReplyCode::CmdOk, "NOOP", &[])
        .unwrap();
    assert_eq!(reply, "");
    assert!(server.commands().is_empty());

    server.finish();
}

#[test]
fn cancellation_returns_before_the_reply() {
    let server = ScriptServer::start(vec![cmd_delayed(
        "200 ok\r\n",
        Duration::from_millis(400),
    )]);
    let session = open(&server);

    let token = CancelToken::new();
    let tripper = token.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        tripper.cancel();
    });

    let start = Instant::now();
    let err = session
        .send_command_cancellable(ReplyCode::CmdOk, "NOOP", &[], &token)
        .unwrap_err();
    assert!(matches!(err, FtpError::Cancelled));
    assert!(start.elapsed() < Duration::from_millis(350));

    drop(session);
    server.finish();
}

// ---------------------------------------------------------------------------
// Domain validation
// ---------------------------------------------------------------------------

#[test]
fn out_of_domain_arguments_never_reach_the_server() {
    let server = ScriptServer::start(vec![]);
    let session = open(&server);

    assert!(session.site_params().file_type("PDF").is_err());
    assert!(session.site_params().jes_lrecl(0).is_err());
    assert!(session.site_params().jes_lrecl(255).is_err());
    assert!(session.site_params().jes_entry_limit(2000).is_err());
    assert!(matches!(
        session.job_status("JOB*"),
        Err(FtpError::InvalidArgument(_))
    ));
    assert!(server.commands().is_empty());

    drop(session);
    server.finish();
}

// ---------------------------------------------------------------------------
// JES submit-and-wait
// ---------------------------------------------------------------------------

#[test]
fn submit_and_fetch_completes_with_spool() {
    let spool = [
        "1 J E S 2  J O B  L O G",
        "12.00.01 JOB07530  $HASP373 MYJOB    STARTED - INIT 1",
        "12.00.02 JOB07530  $HASP395 MYJOB    ENDED - RC=0000",
        " !! END OF JES SPOOL FILE !!",
        "IEF236I ALLOC. FOR MYJOB STEP1",
        " !! END OF JES SPOOL FILE !!",
    ]
    .join("\n");

    let server = ScriptServer::start(vec![
        // FILETYPE=SEQ scope
        cmd("211 FileType SEQ *** end of status ***\r\n"),
        cmd("200 ok\r\n"),
        // dataset attributes for the JCL store
        cmd("200 SITE command was accepted\r\n"),
        // ASCII store of the JCL
        cmd("200 ok\r\n"), // TYPE A
        Step::Pasv,
        recv_data("125 storing\r\n", "250 done\r\n"),
        cmd("200 ok\r\n"), // TYPE A restore
        // FILETYPE=JES NOJESGETBYDSN scope
        cmd("211 FileType SEQ *** end of status ***\r\n"),
        cmd("200 ok\r\n"),
        // JESJOBNAME=* scope
        cmd("211 JESJOBNAME is IBMUSER1 *** end of status ***\r\n"),
        cmd("200 ok\r\n"),
        // ASCII retrieve of the held spool
        cmd("211 Outbound SBCS ASCII data uses CRLF line terminator *** end of status ***\r\n"),
        cmd("200 ok\r\n"), // SITE SBSENDEOL=<system>
        cmd("200 ok\r\n"), // TYPE A
        Step::Pasv,
        send_data(
            "125 When JOB07530 is done\r\n",
            Payload::Bytes(spool.into_bytes()),
            "250 done\r\n",
        ),
        cmd("200 ok\r\n"), // TYPE A restore
        cmd("200 ok\r\n"), // SITE SBSENDEOL restore
        cmd("200 ok\r\n"), // SITE JESJOBNAME restore
        cmd("200 ok\r\n"), // SITE FILETYPE restore (JES scope)
        cmd("200 ok\r\n"), // SITE FILETYPE restore (SEQ scope)
    ]);
    let session = open(&server);

    let jcl = "//MYJOB JOB CLASS=A\n//S1 EXEC PGM=IEFBR14\n";
    let result = session.submit_and_fetch(jcl).unwrap();

    assert_eq!(result.job.id, "JOB07530");
    assert_eq!(result.display_name, "MYJOB");
    assert_eq!(result.return_code, 0);
    assert_eq!(result.spool.len(), 2);

    // the stored JCL went up in ASCII with CRLF records
    assert_eq!(
        server.captured(),
        b"//MYJOB JOB CLASS=A\r\n//S1 EXEC PGM=IEFBR14\r\n"
    );

    let commands = server.commands();
    assert!(commands.iter().any(|c| c == "SITE RECFM=FB LRECL=80 BLKSIZE=27920"));
    assert!(commands.iter().any(|c| c == "SITE FILETYPE=JES NOJESGETBYDSN"));
    assert!(commands.iter().any(|c| c == "SITE JESJOBNAME=*"));
    assert!(commands.iter().any(|c| c.starts_with("STOR JES.D")));
    assert!(commands.iter().any(|c| c.starts_with("RETR JES.D")));
    assert_eq!(commands.iter().filter(|c| *c == "SITE JESJOBNAME=IBMUSER1").count(), 1);
    assert_eq!(session.open_data_connections(), 0);

    drop(session);
    server.finish();
}
