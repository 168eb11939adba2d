//! End-to-end scenarios against a local HTTP range server, covering the
//! concrete behaviors a `RemoteFile` is expected to exhibit: sequential
//! reads to EOF, seeking forward and from the end, a rejected open, and
//! recovery from a dropped connection mid-transfer.

mod support;

use std::time::Duration;

use flowfile::{File, FileSystem, HttpFileSystem};
use support::{Hook, MockServerBuilder};

#[test]
fn sequential_reads_to_eof_return_every_byte() {
    support::init_logging();
    let body = vec![0x41u8; 1024 * 1024];
    let server = MockServerBuilder::new(body.clone()).start();

    let fs = HttpFileSystem::builder().chunk_size(64 * 1024).build();
    let mut file = fs.open(&server.url(), "r").expect("open");

    let mut total = 0usize;
    let mut reads = 0usize;
    loop {
        let mut buf = [0u8; 4096];
        let n = file.read(&mut buf).expect("read");
        if n == 0 {
            break;
        }
        assert!(buf[..n].iter().all(|&b| b == 0x41));
        total += n;
        reads += 1;
    }

    assert_eq!(total, body.len());
    assert_eq!(reads, 256);
    assert!(file.eof());

    let mut trailing = [0u8; 1];
    assert_eq!(file.read(&mut trailing).unwrap(), 0);
}

#[test]
fn seek_forward_then_read_returns_the_right_slice() {
    support::init_logging();
    let body: Vec<u8> = (0u8..10).collect();
    let server = MockServerBuilder::new(body).start();

    let fs = HttpFileSystem::new();
    let mut file = fs.open(&server.url(), "r").expect("open");

    file.seek(5).expect("seek");
    let mut buf = [0u8; 10];
    let n = file.read(&mut buf).expect("read");
    assert_eq!(n, 5);
    assert_eq!(&buf[..5], &[5, 6, 7, 8, 9]);

    let n2 = file.read(&mut buf).expect("read at eof");
    assert_eq!(n2, 0);
    assert!(file.eof());
}

#[test]
fn seek_from_end_reads_the_final_bytes() {
    support::init_logging();
    let body: Vec<u8> = (0u8..=99).collect();
    let server = MockServerBuilder::new(body).start();

    let fs = HttpFileSystem::new();
    let mut file = fs.open(&server.url(), "r").expect("open");

    let size = file.size().expect("known size");
    assert_eq!(size, 100);
    file.seek(size - 10).expect("seek");

    let mut buf = [0u8; 10];
    let n = file.read(&mut buf).expect("read");
    assert_eq!(n, 10);
    let expected: Vec<u8> = (90u8..=99).collect();
    assert_eq!(&buf[..], expected.as_slice());
}

#[test]
fn failed_first_probe_fails_open() {
    support::init_logging();
    let server = MockServerBuilder::new(vec![0u8; 16])
        .on_connection(1, Hook::Status(503))
        .start();

    let fs = HttpFileSystem::new();
    let result = fs.open(&server.url(), "r");
    assert!(result.is_err());
}

#[test]
fn worker_reconnects_after_a_dropped_connection() {
    support::init_logging();
    let body = vec![0x7eu8; 1024 * 1024];
    // Connection 1 is the open() probe. Connection 2 is the first real
    // chunk fetch, which we let through so the reader makes progress.
    // Connection 3 (the second chunk) is dropped outright; the worker's
    // retry loop should reissue it on a fresh connection.
    let server = MockServerBuilder::new(body.clone())
        .on_connection(3, Hook::Drop)
        .start();

    let fs = HttpFileSystem::builder()
        .chunk_size(64 * 1024)
        .retry_max_attempts(5)
        .retry_base_delay(Duration::from_millis(5))
        .build();
    let mut file = fs.open(&server.url(), "r").expect("open");

    let mut collected = Vec::with_capacity(body.len());
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).expect("read recovers from the drop");
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }

    assert_eq!(collected, body);
    assert!(file.eof());
}
