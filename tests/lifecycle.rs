mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{eventually, init_tracing, jpeg, Viewer};
use mjpeg_rs::{Error, Frame, FrameBuffer, MjpegServer, ServerConfig, ServerManager};

fn local_config() -> ServerConfig {
    ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
}

#[tokio::test]
async fn bind_conflict_fails_and_leaves_existing_server_running() {
    init_tracing();
    let buffer = Arc::new(FrameBuffer::new());
    buffer.submit(Frame::new(jpeg(1, 256), 16, 16, 0));

    let existing = MjpegServer::new(local_config(), Arc::clone(&buffer))
        .start()
        .await
        .unwrap();
    let addr = existing.local_addr();

    let result = MjpegServer::new(local_config().port(addr.port()), Arc::clone(&buffer))
        .start()
        .await;
    match result {
        Err(Error::Bind { addr: failed, .. }) => assert_eq!(failed.port(), addr.port()),
        Err(other) => panic!("expected bind error, got {other}"),
        Ok(_) => panic!("second listener bound to an occupied port"),
    }

    let mut viewer = Viewer::connect(addr, "/video").await;
    assert_eq!(viewer.next_frame().await.unwrap().len(), 256);

    existing.stop().await;
}

#[tokio::test]
async fn stop_closes_all_sessions_and_releases_port() {
    init_tracing();
    let buffer = Arc::new(FrameBuffer::new());
    buffer.submit(Frame::new(jpeg(7, 1024), 32, 32, 0));

    let handle = MjpegServer::new(local_config(), Arc::clone(&buffer))
        .start()
        .await
        .unwrap();
    let addr = handle.local_addr();

    let mut viewers = Vec::new();
    for _ in 0..3 {
        let mut viewer = Viewer::connect(addr, "/video").await;
        assert!(viewer.next_frame().await.is_some());
        viewers.push(viewer);
    }
    assert_eq!(handle.active_sessions(), 3);

    handle.stop().await;

    // Every stream is terminated cleanly
    for viewer in &mut viewers {
        assert!(viewer.next_frame().await.is_none());
        viewer.wait_closed().await;
    }

    let again = MjpegServer::new(local_config().port(addr.port()), Arc::clone(&buffer))
        .start()
        .await
        .expect("port must be free after stop");
    assert_eq!(again.local_addr(), addr);
    again.stop().await;
}

#[tokio::test]
async fn restart_tears_down_old_sessions_before_new_instance() {
    let buffer = Arc::new(FrameBuffer::new());
    buffer.submit(Frame::new(jpeg(3, 64), 4, 4, 0));

    let manager = ServerManager::new(Arc::clone(&buffer));
    let addr = manager
        .start(local_config().boundary("old-boundary"))
        .await
        .unwrap();

    let mut old_viewer = Viewer::connect(addr, "/video").await;
    assert!(old_viewer.head.contains("boundary=old-boundary"));
    assert!(old_viewer.next_frame().await.is_some());

    let new_addr = manager
        .restart(local_config().port(addr.port()).boundary("new-boundary"))
        .await
        .unwrap();
    assert_eq!(new_addr, addr);

    // The old session ended before the new listener started accepting
    assert!(old_viewer.next_frame().await.is_none());
    assert_eq!(manager.active_sessions().await, 0);

    let mut new_viewer = Viewer::connect(addr, "/video").await;
    assert!(new_viewer.head.contains("boundary=new-boundary"));
    assert!(new_viewer.next_frame().await.is_some());

    manager.stop().await;
}

#[tokio::test]
async fn viewer_that_never_reads_is_dropped() {
    init_tracing();
    let buffer = Arc::new(FrameBuffer::new());
    buffer.submit(Frame::new(jpeg(5, 2 * 1024 * 1024), 1920, 1080, 0));

    let config = local_config()
        .write_timeout(Duration::from_millis(200))
        .resend_duplicate_frames();
    let handle = MjpegServer::new(config, Arc::clone(&buffer))
        .start()
        .await
        .unwrap();

    // Send the request, then never read the response
    let mut stalled = tokio::net::TcpStream::connect(handle.local_addr()).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut stalled, b"GET /video HTTP/1.1\r\n\r\n")
        .await
        .unwrap();

    assert!(eventually(Duration::from_secs(5), || handle.active_sessions() == 1).await);
    assert!(
        eventually(Duration::from_secs(20), || handle.active_sessions() == 0).await,
        "stalled session was never torn down"
    );

    handle.stop().await;
    drop(stalled);
}

#[tokio::test]
async fn status_path_answers_while_streaming() {
    let buffer = Arc::new(FrameBuffer::new());
    let handle = MjpegServer::new(local_config(), Arc::clone(&buffer))
        .start()
        .await
        .unwrap();
    let addr = handle.local_addr();

    let _viewer = Viewer::connect(addr, "/video").await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut stream, b"GET /anything HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
        .await
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("IP Webcam Running!"));

    handle.stop().await;
}
