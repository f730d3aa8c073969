use std::collections::VecDeque;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use cgrid_common::wire::{Fault, FaultKind, Request, Response, WireEntry, codec_config};
use cgrid_common::{AuthorizationSet, Mutation, ScanOptions, TimeType, WriterOptions};
use cgrid_client::{ClientError, ConnectionParams, GridConnector, PoolExecutor, SyncConnector};

type Handler = Arc<dyn Fn(Request) -> Response + Send + Sync + 'static>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Accepts connections and answers each framed request via `handler`.
fn spawn_server(handler: Handler) -> ConnectionParams {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        while let Ok((stream, _)) = listener.accept() {
            let handler = Arc::clone(&handler);
            thread::spawn(move || serve(stream, handler));
        }
    });

    ConnectionParams::new(addr.ip().to_string(), addr.port())
}

fn serve(mut stream: TcpStream, handler: Handler) {
    let config = codec_config();
    loop {
        let request: Request = match bincode::decode_from_std_read(&mut stream, config) {
            Ok(request) => request,
            Err(_) => break,
        };
        let response = handler(request);
        if bincode::encode_into_std_write(response, &mut stream, config).is_err() {
            break;
        }
    }
}

fn entry(row: &str, value: &str) -> WireEntry {
    WireEntry {
        row: row.as_bytes().to_vec(),
        family: b"cf".to_vec(),
        qualifier: b"cq".to_vec(),
        visibility: Vec::new(),
        timestamp: 10,
        value: value.as_bytes().to_vec(),
    }
}

/// Scripted remote service: one table, one scanner, one writer, stored
/// authorizations. Records every request for later assertions.
fn scripted_server(entries: Vec<WireEntry>) -> (ConnectionParams, Arc<Mutex<Vec<Request>>>) {
    let log: Arc<Mutex<Vec<Request>>> = Arc::new(Mutex::new(Vec::new()));
    let entries = Mutex::new(VecDeque::from(entries));
    let auths: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

    let handler_log = Arc::clone(&log);
    let params = spawn_server(Arc::new(move |request: Request| {
        handler_log.lock().push(request.clone());
        match request {
            Request::CreateScanner { .. } | Request::CreateBatchScanner { .. } => {
                Response::Resource(cgrid_common::ResourceId::new("scan-1"))
            }
            Request::CreateWriter { .. } => {
                Response::Resource(cgrid_common::ResourceId::new("write-1"))
            }
            Request::NextEntry { .. } => match entries.lock().pop_front() {
                Some(entry) => Response::Entry(entry),
                None => Response::Fault(Fault::new(FaultKind::NoMoreEntries, "end of scan")),
            },
            Request::CloseScanner { .. }
            | Request::ApplyUpdates { .. }
            | Request::CloseWriter { .. }
            | Request::CreateTable { .. } => Response::Unit,
            Request::TableExists { table, .. } => Response::Bool(table == "trades"),
            Request::ChangeUserAuthorizations { authorizations, .. } => {
                *auths.lock() = authorizations;
                Response::Unit
            }
            Request::GetUserAuthorizations { .. } => {
                Response::Authorizations(auths.lock().clone())
            }
        }
    }));
    (params, log)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_connector_end_to_end() {
    init_tracing();
    let (params, log) = scripted_server(vec![entry("r1", "v1"), entry("r2", "v2")]);

    let executor = Arc::new(PoolExecutor::connect(params).expect("executor"));
    let connector = GridConnector::new(Arc::clone(&executor), b"secret".to_vec());

    connector
        .create_table("trades", true, TimeType::Millis)
        .await
        .expect("create table");
    assert!(connector.table_exists("trades").await.expect("exists"));
    assert!(!connector.table_exists("missing").await.expect("exists"));

    let mut scanner = connector
        .create_scanner("trades", ScanOptions::default())
        .await
        .expect("create scanner");
    let first = scanner.next().await.expect("next").expect("entry");
    assert_eq!(first.row(), b"r1");
    assert_eq!(first.value_str(), "v1");
    let second = scanner.next().await.expect("next").expect("entry");
    assert_eq!(second.row(), b"r2");
    assert!(scanner.next().await.expect("exhaustion").is_none());
    scanner.close().await.expect("close scanner");

    let mut writer = connector
        .create_writer("trades", WriterOptions::default())
        .await
        .expect("create writer");
    writer
        .add([
            Mutation::new("r1").family("a").value("1"),
            Mutation::new("r1").family("b").value("2"),
            Mutation::new("r2").family("c").value("3"),
        ])
        .await
        .expect("add");
    writer.close().await.expect("close writer");

    let auths: AuthorizationSet = ["public"].into_iter().collect();
    connector
        .change_user_authorizations("reader", &auths)
        .await
        .expect("change auths");
    let roundtrip = connector
        .get_user_authorizations("reader")
        .await
        .expect("get auths");
    assert_eq!(roundtrip, auths);

    // Every recorded token-carrying request presented the same secret, and
    // the one apply-updates call carried the row-grouped batch.
    let log = log.lock();
    let mut update_batches = 0;
    for request in log.iter() {
        match request {
            Request::CreateScanner { secret, .. }
            | Request::CreateBatchScanner { secret, .. }
            | Request::CreateWriter { secret, .. }
            | Request::CreateTable { secret, .. }
            | Request::TableExists { secret, .. }
            | Request::ChangeUserAuthorizations { secret, .. }
            | Request::GetUserAuthorizations { secret, .. } => {
                assert_eq!(secret, b"secret");
            }
            Request::ApplyUpdates { batch, .. } => {
                update_batches += 1;
                assert_eq!(batch.len(), 2);
                assert_eq!(batch.rows()[0].row, b"r1");
                assert_eq!(batch.rows()[0].updates.len(), 2);
                assert_eq!(batch.rows()[1].row, b"r2");
            }
            Request::NextEntry { resource }
            | Request::CloseScanner { resource } => {
                assert_eq!(resource.as_str(), "scan-1");
            }
            Request::CloseWriter { resource } => {
                assert_eq!(resource.as_str(), "write-1");
            }
        }
    }
    assert_eq!(update_batches, 1);
    drop(log);

    executor.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_not_found_propagates_unchanged() {
    init_tracing();
    let params = spawn_server(Arc::new(|request: Request| match request {
        Request::TableExists { .. } => {
            Response::Fault(Fault::new(FaultKind::NotFound, "unknown table"))
        }
        _ => Response::Fault(Fault::new(FaultKind::Internal, "unexpected request")),
    }));

    let executor = Arc::new(PoolExecutor::connect(params).expect("executor"));
    let connector = GridConnector::new(Arc::clone(&executor), b"secret".to_vec());

    let result = connector.table_exists("nope").await;
    match result {
        Err(ClientError::NotFound(message)) => assert_eq!(message, "unknown table"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    executor.close();
}

#[test]
fn sync_connector_end_to_end() {
    init_tracing();
    let (params, log) = scripted_server(vec![entry("r1", "v1")]);

    let connector = SyncConnector::connect(params, b"secret".to_vec()).expect("connect");

    connector
        .create_table("trades", true, TimeType::Millis)
        .expect("create table");
    assert!(connector.table_exists("trades").expect("exists"));

    let mut scanner = connector
        .create_scanner("trades", ScanOptions::default())
        .expect("create scanner");
    let rows: Vec<Vec<u8>> = scanner
        .by_ref()
        .map(|entry| entry.expect("entry").row().to_vec())
        .collect();
    assert_eq!(rows, vec![b"r1".to_vec()]);
    scanner.close().expect("close scanner");

    let mut writer = connector
        .create_writer("trades", WriterOptions::default())
        .expect("create writer");
    writer
        .add([Mutation::new("r9").family("cf").value("v")])
        .expect("add");
    writer.close().expect("close writer");

    connector.close().expect("close connection");

    let log = log.lock();
    assert!(
        log.iter()
            .any(|request| matches!(request, Request::ApplyUpdates { .. }))
    );
}
