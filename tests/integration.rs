//! Integration tests for waywire-client.
//!
//! Each test drives a real client connection against a scripted compositor on
//! the other end of a socket pair. Client and compositor run concurrently on
//! the test runtime via `tokio::join!`.

mod common;

use std::fs::File;
use std::io::Write;
use std::os::fd::OwnedFd;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use parking_lot::Mutex;

use common::{MockCompositor, SERVER_ID};
use waywire_client::codec::{ArgKind, Argument, Message, ObjectId};
use waywire_client::interface::{Interface, MessageDesc};
use waywire_client::object::resolve;
use waywire_client::wl::{WlCompositor, WlShm};
use waywire_client::{
    BindError, Connection, Globals, ObjectHandle, Proxy, Result, WaywireError,
};

// ============================================================================
// Test interfaces
// ============================================================================

static ECHO_INTERFACE: Interface = Interface {
    name: "test_echo",
    version: 1,
    requests: &[
        MessageDesc::new("ping", &[ArgKind::Uint]),
        MessageDesc::new("destroy", &[]).destructor(),
    ],
    events: &[
        MessageDesc::new("pong", &[ArgKind::Uint]),
        MessageDesc::new("file", &[ArgKind::Fd]),
        MessageDesc::new("spawn", &[ArgKind::NewId]).child(&CHILD_INTERFACE),
    ],
};

static CHILD_INTERFACE: Interface = Interface {
    name: "test_child",
    version: 1,
    requests: &[],
    events: &[
        MessageDesc::new("hello", &[ArgKind::String]),
        MessageDesc::new("file", &[ArgKind::Fd]),
    ],
};

#[derive(Debug, Clone, PartialEq)]
struct Echo {
    handle: ObjectHandle,
}

#[derive(Debug)]
enum EchoEvent {
    Pong(u32),
    File(OwnedFd),
    Spawn(Child),
}

impl Echo {
    fn ping(&self, value: u32) -> Result<()> {
        self.handle.send_request(0, vec![Argument::Uint(value)])
    }

    fn destroy(&self) -> Result<()> {
        self.handle.send_request(1, Vec::new())
    }
}

impl Proxy for Echo {
    type Event = EchoEvent;
    const INTERFACE: &'static Interface = &ECHO_INTERFACE;

    fn from_handle(handle: ObjectHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn parse_event(conn: &Connection, message: Message) -> Result<EchoEvent> {
        let opcode = message.opcode;
        let mut args = message.into_args();
        match opcode {
            0 => Ok(EchoEvent::Pong(args.uint()?)),
            1 => Ok(EchoEvent::File(args.fd()?)),
            2 => Ok(EchoEvent::Spawn(resolve(conn, args.new_id()?)?)),
            _ => Err(WaywireError::UnknownOpcode {
                interface: ECHO_INTERFACE.name,
                opcode,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Child {
    handle: ObjectHandle,
}

#[derive(Debug)]
enum ChildEvent {
    Hello(String),
    File(OwnedFd),
}

impl Proxy for Child {
    type Event = ChildEvent;
    const INTERFACE: &'static Interface = &CHILD_INTERFACE;

    fn from_handle(handle: ObjectHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn parse_event(_conn: &Connection, message: Message) -> Result<ChildEvent> {
        let opcode = message.opcode;
        let mut args = message.into_args();
        match opcode {
            0 => Ok(ChildEvent::Hello(args.string()?)),
            1 => Ok(ChildEvent::File(args.fd()?)),
            _ => Err(WaywireError::UnknownOpcode {
                interface: CHILD_INTERFACE.name,
                opcode,
            }),
        }
    }
}

/// Bind `test_echo` as global 1. The compositor returns the echo object id.
async fn setup_echo(conn: &Connection, server: &mut MockCompositor) -> (Echo, ObjectId) {
    let client = async {
        let globals = Globals::init(conn).await.unwrap();
        globals.bind::<Echo>(1..=1).unwrap()
    };
    let compositor = server.advertise(&[(1, "test_echo", 1)]);
    let (echo, registry) = tokio::join!(client, compositor);
    conn.flush().await.unwrap();
    let bind = server.expect_bind(registry).await;
    assert_eq!(bind.new_id(), echo.id());
    let id = echo.id();
    (echo, id)
}

fn temp_file(contents: &str) -> File {
    let path = std::env::temp_dir().join(format!(
        "waywire-it-{}-{}",
        std::process::id(),
        contents.len()
    ));
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(&path)
        .unwrap();
    std::fs::remove_file(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn read_fd(fd: OwnedFd) -> String {
    let file = File::from(fd);
    let mut buf = vec![0u8; 64];
    let n = file.read_at(&mut buf, 0).unwrap();
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

// ============================================================================
// Roundtrip
// ============================================================================

#[tokio::test]
async fn test_roundtrip_waits_for_prior_events() {
    let (conn, mut server) = common::connect();
    let (echo, echo_id) = setup_echo(&conn, &mut server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    echo.on_event(move |_, _, event| {
        if let EchoEvent::Pong(value) = event {
            sink.lock().push(value);
        }
    });

    let client = async {
        echo.ping(1).unwrap();
        echo.ping(2).unwrap();
        conn.roundtrip().await.unwrap();
        seen.lock().clone()
    };
    let compositor = async {
        for expected in [1, 2] {
            let ping = server.expect(echo_id, 0, &[ArgKind::Uint]).await;
            assert_eq!(ping.args, vec![Argument::Uint(expected)]);
        }
        let callback = server.expect_sync().await;
        server.send(echo_id, 0, vec![Argument::Uint(1)]).await;
        server.send(echo_id, 0, vec![Argument::Uint(2)]).await;
        server.done(callback, 0).await;
    };

    let (seen, ()) = tokio::join!(client, compositor);
    assert_eq!(seen, vec![1, 2]);
}

#[tokio::test]
async fn test_roundtrip_on_private_queue() {
    let (conn, mut server) = common::connect();
    let queue = conn.new_event_queue();

    let client = async {
        let globals = Globals::new_on(&conn, &queue).unwrap();
        queue.roundtrip().await.unwrap();
        globals
    };
    let compositor = async {
        let registry = server.expect_get_registry().await;
        let callback = server.expect_sync().await;
        server.global(registry, 1, "wl_shm", 1).await;
        // no delete_id, so nothing lands on the main queue
        server.send(callback, 0, vec![Argument::Uint(0)]).await;
    };

    let (globals, ()) = tokio::join!(client, compositor);
    assert!(globals.contains("wl_shm"));
    assert!(conn.main_queue().is_empty());
}

// ============================================================================
// Global discovery
// ============================================================================

#[tokio::test]
async fn test_bind_negotiates_version_and_tracks_removal() {
    let (conn, mut server) = common::connect();

    let client = async {
        let globals = Globals::init(&conn).await.unwrap();
        let compositor: WlCompositor = globals.bind(1..=4).unwrap();
        conn.flush().await.unwrap();
        (globals, compositor)
    };
    let compositor = async {
        let registry = server.advertise(&[(3, "wl_compositor", 4)]).await;
        let bind = server.expect_bind(registry).await;
        (registry, bind)
    };
    let ((globals, compositor), (registry, bind)) = tokio::join!(client, compositor);

    assert_eq!(compositor.version(), 4);
    assert_eq!(
        bind.args,
        vec![
            Argument::Uint(3),
            Argument::Str("wl_compositor".into()),
            Argument::Uint(4),
            Argument::NewId(compositor.id()),
        ]
    );

    let client = conn.roundtrip();
    let removal = async {
        let callback = server.expect_sync().await;
        server.global_remove(registry, 3).await;
        server.done(callback, 0).await;
    };
    let (result, ()) = tokio::join!(client, removal);
    result.unwrap();

    assert!(!globals.contains("wl_compositor"));
    assert!(compositor.is_alive());
}

#[tokio::test]
async fn test_bind_failures_send_nothing() {
    let (conn, mut server) = common::connect();

    let client = Globals::init(&conn);
    let compositor = server.advertise(&[(1, "wl_shm", 1)]);
    let (globals, _) = tokio::join!(client, compositor);
    let globals = globals.unwrap();

    assert!(matches!(
        globals.bind::<WlShm>(2..=2),
        Err(BindError::UnsupportedVersion {
            advertised: 1,
            required: 2
        })
    ));
    assert!(matches!(
        globals.bind::<WlCompositor>(1..=4),
        Err(BindError::NotPresent)
    ));
    assert_eq!(conn.pending_requests(), 0);
}

// ============================================================================
// Object lifecycle
// ============================================================================

#[tokio::test]
async fn test_destroy_then_delete_id() {
    let (conn, mut server) = common::connect();

    let client = async {
        let globals = Globals::init(&conn).await.unwrap();
        let compositor: WlCompositor = globals.bind(1..=4).unwrap();
        let surface = compositor.create_surface().unwrap();
        surface.destroy().unwrap();
        (compositor, surface)
    };
    let compositor = server.advertise(&[(1, "wl_compositor", 4)]);
    let ((compositor, surface), registry) = tokio::join!(client, compositor);

    assert!(!surface.is_alive());
    let queued = conn.pending_requests();
    assert!(matches!(
        surface.commit(),
        Err(WaywireError::Destroyed { .. })
    ));
    assert_eq!(conn.pending_requests(), queued);

    let client = conn.roundtrip();
    let script = async {
        server.expect_bind(registry).await;
        let create = server
            .expect(compositor.id(), 0, &[ArgKind::NewId])
            .await;
        assert_eq!(create.new_id(), surface.id());
        server.expect(surface.id(), 0, &[]).await;
        let callback = server.expect_sync().await;

        // in flight before the compositor saw the destroy
        server.send(surface.id(), 0, vec![Argument::Object(SERVER_ID)]).await;
        server.delete_id(surface.id()).await;
        server.done(callback, 0).await;
    };
    let (result, ()) = tokio::join!(client, script);
    result.unwrap();

    assert!(conn.object(surface.id()).is_none());
    assert!(!conn.is_closed());
    assert!(!server.has_pending());
}

#[tokio::test]
async fn test_server_created_object() {
    let (conn, mut server) = common::connect();
    let (echo, echo_id) = setup_echo(&conn, &mut server).await;

    let greetings = Arc::new(Mutex::new(Vec::new()));
    let sink = greetings.clone();
    echo.on_event(move |_, _, event| {
        if let EchoEvent::Spawn(child) = event {
            let sink = sink.clone();
            child.on_event(move |_, child, event| {
                if let ChildEvent::Hello(text) = event {
                    sink.lock().push((child.id(), text));
                }
            });
        }
    });

    let client = conn.roundtrip();
    let script = async {
        let callback = server.expect_sync().await;
        server.send(echo_id, 2, vec![Argument::NewId(SERVER_ID)]).await;
        server
            .send(SERVER_ID, 0, vec![Argument::Str("hi".into())])
            .await;
        server.done(callback, 0).await;
    };
    let (result, ()) = tokio::join!(client, script);
    result.unwrap();

    assert_eq!(*greetings.lock(), vec![(SERVER_ID, "hi".to_string())]);
    let child = conn.object(SERVER_ID).unwrap();
    assert_eq!(child.interface().name, "test_child");
    assert_eq!(child.version(), 1);
}

#[tokio::test]
async fn test_child_of_destroyed_object_consumes_its_fds() {
    let (conn, mut server) = common::connect();

    let client = async {
        let globals = Globals::init(&conn).await.unwrap();
        let live = globals.bind::<Echo>(1..=1).unwrap();
        let doomed = globals.bind::<Echo>(1..=1).unwrap();
        (live, doomed)
    };
    let compositor = server.advertise(&[(1, "test_echo", 1)]);
    let ((live, doomed), registry) = tokio::join!(client, compositor);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    live.on_event(move |_, _, event| {
        if let EchoEvent::File(fd) = event {
            sink.lock().push(read_fd(fd));
        }
    });
    doomed.destroy().unwrap();
    assert!(!doomed.is_alive());

    let client = conn.roundtrip();
    let script = async {
        server.expect_bind(registry).await;
        server.expect_bind(registry).await;
        server.expect(doomed.id(), 1, &[]).await;
        let callback = server.expect_sync().await;

        // in flight before the compositor saw the destroy
        server
            .send(doomed.id(), 2, vec![Argument::NewId(SERVER_ID)])
            .await;
        let orphan = temp_file("orphan");
        server
            .send(SERVER_ID, 1, vec![Argument::Fd(OwnedFd::from(orphan))])
            .await;
        let file = temp_file("live");
        server
            .send(live.id(), 1, vec![Argument::Fd(OwnedFd::from(file))])
            .await;
        server.delete_id(doomed.id()).await;
        server.done(callback, 0).await;
    };
    let (result, ()) = tokio::join!(client, script);
    result.unwrap();

    assert_eq!(*received.lock(), vec!["live".to_string()]);
    assert!(conn.object(SERVER_ID).is_none());
    assert!(conn.object(doomed.id()).is_none());
    assert!(!conn.is_closed());
}

// ============================================================================
// File descriptors
// ============================================================================

#[tokio::test]
async fn test_client_sends_fd() {
    let (conn, mut server) = common::connect();

    let client = async {
        let globals = Globals::init(&conn).await.unwrap();
        let shm: WlShm = globals.bind(1..=1).unwrap();
        let file = temp_file("shared pool");
        let pool = shm.create_pool(OwnedFd::from(file), 4096).unwrap();
        conn.flush().await.unwrap();
        (shm, pool)
    };
    let script = async {
        let registry = server.advertise(&[(2, "wl_shm", 1)]).await;
        let bind = server.expect_bind(registry).await;
        let shm_id = bind.new_id();
        server
            .expect(shm_id, 0, &[ArgKind::NewId, ArgKind::Fd, ArgKind::Int])
            .await
    };
    let ((_shm, pool), mut request) = tokio::join!(client, script);

    assert_eq!(request.new_id(), pool.id());
    assert_eq!(request.args.pop(), Some(Argument::Int(4096)));
    let Some(Argument::Fd(fd)) = request.args.pop() else {
        panic!("expected fd argument, got {:?}", request.args);
    };
    assert_eq!(read_fd(fd), "shared pool");
}

#[tokio::test]
async fn test_compositor_sends_fd() {
    let (conn, mut server) = common::connect();
    let (echo, echo_id) = setup_echo(&conn, &mut server).await;

    let received = Arc::new(Mutex::new(None));
    let sink = received.clone();
    echo.on_event(move |_, _, event| {
        if let EchoEvent::File(fd) = event {
            *sink.lock() = Some(fd);
        }
    });

    let client = conn.roundtrip();
    let script = async {
        let callback = server.expect_sync().await;
        let file = temp_file("from the compositor");
        server
            .send(echo_id, 1, vec![Argument::Fd(OwnedFd::from(file))])
            .await;
        server.done(callback, 0).await;
    };
    let (result, ()) = tokio::join!(client, script);
    result.unwrap();

    let fd = received.lock().take().unwrap();
    assert_eq!(read_fd(fd), "from the compositor");
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_event_for_unknown_object_is_skipped() {
    let (conn, mut server) = common::connect();

    let client = conn.roundtrip();
    let script = async {
        let callback = server.expect_sync().await;
        server.send(500, 0, vec![Argument::Uint(1)]).await;
        server.done(callback, 0).await;
    };
    let (result, ()) = tokio::join!(client, script);

    result.unwrap();
    assert!(!conn.is_closed());
}

#[tokio::test]
async fn test_unknown_opcode_is_fatal() {
    let (conn, mut server) = common::connect();

    let client = conn.roundtrip();
    let script = async {
        server.expect_sync().await;
        server.send(1, 7, Vec::new()).await;
    };
    let (result, ()) = tokio::join!(client, script);

    assert!(matches!(
        result,
        Err(WaywireError::UnknownOpcode { opcode: 7, .. })
    ));
    assert!(conn.is_closed());
    assert!(matches!(conn.flush().await, Err(WaywireError::Defunct(_))));
}

#[tokio::test]
async fn test_truncated_message_is_fatal() {
    let (conn, mut server) = common::connect();

    let client = conn.roundtrip();
    let script = async {
        server.expect_sync().await;
        // header claims 4 bytes, below the header size
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_ne_bytes());
        bytes.extend_from_slice(&(4u32 << 16).to_ne_bytes());
        server.send_raw(&bytes, &[]).await;
    };
    let (result, ()) = tokio::join!(client, script);

    assert!(matches!(result, Err(WaywireError::Protocol(_))));
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_server_error_ends_connection() {
    let (conn, mut server) = common::connect();

    let client = conn.roundtrip();
    let script = async {
        server.expect_sync().await;
        server.error(1, 1, "invalid method").await;
    };
    let (result, ()) = tokio::join!(client, script);

    match result {
        Err(WaywireError::Server {
            object_id,
            interface,
            code,
            message,
        }) => {
            assert_eq!(object_id, 1);
            assert_eq!(interface, "wl_display");
            assert_eq!(code, 1);
            assert_eq!(message, "invalid method");
        }
        other => panic!("expected server error, got {:?}", other),
    }
    assert!(conn.is_closed());
    assert!(matches!(
        conn.display().sync().map(|_| ()),
        Err(WaywireError::Defunct(_))
    ));
}

#[tokio::test]
async fn test_server_error_behind_other_events_in_one_read() {
    let (conn, mut server) = common::connect();
    let globals = Globals::new(&conn).unwrap();

    let client = conn.roundtrip();
    let script = async {
        let registry = server.expect_get_registry().await;
        server.expect_sync().await;
        server
            .send_batch(vec![
                (
                    registry,
                    0,
                    vec![
                        Argument::Uint(1),
                        Argument::Str("wl_shm".into()),
                        Argument::Uint(1),
                    ],
                ),
                (
                    1,
                    0,
                    vec![
                        Argument::Object(1),
                        Argument::Uint(7),
                        Argument::Str("boom".into()),
                    ],
                ),
            ])
            .await;
    };
    let (result, ()) = tokio::join!(client, script);

    assert!(
        matches!(result, Err(WaywireError::Server { code: 7, ref message, .. }) if message == "boom"),
        "expected server error, got {:?}",
        result
    );
    assert!(globals.contains("wl_shm"));
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_peer_close_ends_connection() {
    let (conn, mut server) = common::connect();

    let client = conn.roundtrip();
    let script = async move {
        server.expect_sync().await;
        server.close();
    };
    let (result, ()) = tokio::join!(client, script);

    assert!(matches!(result, Err(WaywireError::ConnectionClosed)));
    assert!(conn.is_closed());
    assert!(matches!(conn.dispatch().await, Err(WaywireError::Defunct(_))));
}

#[tokio::test]
async fn test_disconnect_drops_everything() {
    let (conn, mut server) = common::connect();

    let client = Globals::init(&conn);
    let compositor = server.advertise(&[(1, "wl_compositor", 4)]);
    let (globals, _) = tokio::join!(client, compositor);
    let globals = globals.unwrap();
    let compositor: WlCompositor = globals.bind(1..=4).unwrap();

    conn.disconnect();

    assert!(!compositor.is_alive());
    assert!(!globals.registry().is_alive());
    assert!(matches!(
        compositor.create_surface(),
        Err(WaywireError::Defunct(_))
    ));
    assert!(matches!(
        conn.roundtrip().await,
        Err(WaywireError::Defunct(_))
    ));
}
