use std::io::{Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use proptest::prelude::*;
use stow_fs::{hash, ErrorKind, File, Hash, Limit, MemFile, Op, ReadOnly, Store, Unique};
use stow_sftp::{MemorySession, Session, SftpStore};

fn mem(name: &str, data: &[u8]) -> Box<dyn File> {
    Box::new(MemFile::new(name, data.to_vec(), SystemTime::now()))
}

fn store() -> (Arc<MemorySession>, SftpStore<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    session.mkdir_all("/srv/files").unwrap();
    let store = SftpStore::new(Arc::clone(&session), "/srv/files");
    (session, store)
}

fn read_all(file: &mut Box<dyn File>) -> Vec<u8> {
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    buf
}

#[test]
fn put_then_open_round_trips() {
    let (session, store) = store();

    let mut stored = store.put(mem("report.txt", b"quarterly")).unwrap();
    assert_eq!(read_all(&mut stored), b"quarterly");
    assert_eq!(stored.stat().unwrap().name, "report.txt");

    let mut opened = store.open("report.txt").unwrap();
    assert_eq!(read_all(&mut opened), b"quarterly");

    let info = store.stat("report.txt").unwrap();
    assert_eq!(info.name, "report.txt");
    assert_eq!(info.size, 9);
    assert!(!info.is_dir);
    assert_eq!(session.contents("/srv/files/report.txt").unwrap(), b"quarterly");
}

#[test]
fn put_truncates_existing_file() {
    let (session, store) = store();
    store.put(mem("f", b"a much longer first version")).unwrap();
    store.put(mem("f", b"short")).unwrap();
    assert_eq!(session.contents("/srv/files/f").unwrap(), b"short");
}

#[test]
fn missing_file_is_not_exist() {
    let (_, store) = store();

    let err = store.open("nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotExist);
    assert_eq!(err.op(), Some(Op::Open));
    assert!(err.to_string().starts_with("open nope:"));

    assert!(store.stat("nope").unwrap_err().is_not_exist());
    assert_eq!(store.remove("nope").unwrap_err().op(), Some(Op::Remove));
}

#[test]
fn remove_deletes_the_file() {
    let (session, store) = store();
    store.put(mem("gone", b"x")).unwrap();
    store.remove("gone").unwrap();
    assert!(session.contents("/srv/files/gone").is_none());
    assert!(store.stat("gone").unwrap_err().is_not_exist());
}

#[test]
fn sub_creates_remote_directories() {
    let (session, store) = store();

    let nested = store.sub("a/b").unwrap();
    assert!(session.is_dir("/srv/files/a"));
    assert!(session.is_dir("/srv/files/a/b"));

    nested.put(mem("deep", b"1")).unwrap();
    assert_eq!(session.contents("/srv/files/a/b/deep").unwrap(), b"1");

    // Already there.
    store.sub("a/b").unwrap();
}

#[test]
fn parent_traversal_is_invalid() {
    let (_, store) = store();
    assert_eq!(store.open("../etc/passwd").unwrap_err().kind(), ErrorKind::Invalid);
    assert_eq!(store.sub("a/../..").err().unwrap().kind(), ErrorKind::Invalid);
    assert_eq!(store.put(mem("..", b"x")).unwrap_err().kind(), ErrorKind::Invalid);
    assert_eq!(store.stat("").unwrap_err().kind(), ErrorKind::Invalid);
}

#[test]
fn dropped_connection_is_closed() {
    let (session, store) = store();
    let mut stored = store.put(mem("f", b"data")).unwrap();
    session.disconnect();

    let err = store.open("f").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    assert_eq!(store.put(mem("g", b"x")).unwrap_err().kind(), ErrorKind::Closed);
    assert_eq!(store.sub("d").err().unwrap().kind(), ErrorKind::Closed);

    let mut buf = [0u8; 4];
    assert_eq!(
        stored.read(&mut buf).unwrap_err().kind(),
        std::io::ErrorKind::NotConnected
    );
}

#[test]
fn decorators_compose_over_sftp() {
    let (session, store) = store();
    let store = Limit::new(Hash::new(Unique::new(store), hash::sha256), 64);

    let mut stored = store.put(mem("hello", b"hello world")).unwrap();
    let digest = stored.stat().unwrap().name;
    assert_eq!(
        digest,
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
    assert_eq!(
        session.contents(&format!("/srv/files/{digest}")).unwrap(),
        b"hello world"
    );

    assert_eq!(store.put(mem("again", b"hello world")).unwrap_err().kind(), ErrorKind::Exist);
    assert_eq!(store.put(mem("big", &[0u8; 65])).unwrap_err().kind(), ErrorKind::TooLarge);
}

#[test]
fn read_only_store_still_reads() {
    let (session, store) = store();
    let mut handle = session.create("/srv/files/seed").unwrap();
    handle.write_all(b"seeded").unwrap();

    let store = ReadOnly::new(store);
    let mut opened = store.open("seed").unwrap();
    assert_eq!(read_all(&mut opened), b"seeded");
    assert_eq!(store.put(mem("x", b"1")).unwrap_err().kind(), ErrorKind::Permission);
}

proptest! {
    #[test]
    fn arbitrary_bytes_round_trip(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        name in "[a-z0-9]{1,12}",
    ) {
        let (session, store) = store();
        let mut stored = store.put(mem(&name, &data)).unwrap();
        prop_assert_eq!(read_all(&mut stored), data.clone());
        prop_assert_eq!(store.stat(&name).unwrap().size, data.len() as u64);

        let mut opened = store.open(&name).unwrap();
        prop_assert_eq!(read_all(&mut opened), data.clone());
        prop_assert_eq!(session.contents(&format!("/srv/files/{name}")).unwrap(), data);
    }
}
