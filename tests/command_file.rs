// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Verify the write-command, read-answer protocol of command files.
// Author: Lukas Bower

use std::sync::{Arc, Mutex};

use diagchan::{AnswerHandle, AnswerSlot, CommandFile};
use synthfs::{FaultingBuffer, FaultingData, FsError, Mode, OpenFlags, Signal, SyntheticFs};

/// Binding that records every command and answers with the last one.
#[derive(Default)]
struct Journal {
    commands: Mutex<Vec<String>>,
    slot: Arc<AnswerSlot>,
}

impl Journal {
    fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("lock").clone()
    }
}

fn record(command: &str, journal: &Journal, _signal: &Signal) -> Result<(), FsError> {
    journal.commands.lock().expect("lock").push(command.to_owned());
    journal.slot.set(format!("ran {command}"));
    Ok(())
}

fn owned_answer(journal: &Journal) -> Option<AnswerHandle> {
    Some(AnswerHandle::owned(journal.slot.get()))
}

fn shared_answer(journal: &Journal) -> Option<AnswerHandle> {
    Some(AnswerHandle::shared(&journal.slot))
}

fn setup(shared: bool) -> (SyntheticFs, Arc<Journal>) {
    let fs = SyntheticFs::new();
    let journal = Arc::new(Journal::default());
    journal.slot.set("done");
    let file = CommandFile::new(Arc::clone(&journal)).with_handler(record);
    let file = if shared {
        file.with_provider(shared_answer)
    } else {
        file.with_provider(owned_answer)
    };
    file.create(&fs, "ctl", Mode::CONTROL, None).expect("create");
    (fs, journal)
}

#[test]
fn trailing_newline_is_not_part_of_the_command() {
    let (fs, journal) = setup(false);
    let mut file = fs.open("ctl", OpenFlags::WRITE).expect("open");
    assert_eq!(file.write(b"reset\n"), Ok(6));
    assert_eq!(journal.commands(), vec!["reset"]);
}

#[test]
fn empty_and_repositioned_writes_are_rejected() {
    let (fs, journal) = setup(false);
    let mut file = fs.open("ctl", OpenFlags::WRITE).expect("open");
    assert_eq!(file.write(b""), Err(FsError::InvalidArgument));
    assert_eq!(file.pwrite(b"reset", 3), Err(FsError::InvalidArgument));
    assert!(journal.commands().is_empty());
}

#[test]
fn faulting_writer_reports_io() {
    let (fs, journal) = setup(false);
    let mut file = fs.open("ctl", OpenFlags::WRITE).expect("open");
    assert_eq!(file.write_user(&FaultingData::new(5)), Err(FsError::Io));
    assert!(journal.commands().is_empty());
}

#[test]
fn answer_is_streamed_with_its_terminator() {
    let (fs, _journal) = setup(false);
    let mut file = fs.open("ctl", OpenFlags::READ).expect("open");
    let mut streamed = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match file.read(&mut byte).expect("read") {
            0 => break,
            n => streamed.extend_from_slice(&byte[..n]),
        }
    }
    assert_eq!(streamed, b"done\0");
    assert_eq!(file.position(), 5);
    let mut rest = [0u8; 4];
    assert_eq!(file.pread(&mut rest, 5), Ok(0));
    assert_eq!(file.pread(&mut rest, 6), Err(FsError::InvalidArgument));
    assert_eq!(file.pread(&mut rest, 4), Ok(1));
    assert_eq!(rest[0], 0);
}

#[test]
fn owned_answer_is_a_snapshot_taken_at_open() {
    let (fs, _journal) = setup(false);
    let mut reader = fs.open("ctl", OpenFlags::READ).expect("open");
    fs.open("ctl", OpenFlags::WRITE)
        .expect("open")
        .write(b"status")
        .expect("write");
    assert_eq!(reader.read_to_end(16).expect("read"), b"done\0");
    let mut fresh = fs.open("ctl", OpenFlags::READ).expect("open");
    assert_eq!(fresh.read_to_end(16).expect("read"), b"ran status\0");
}

#[test]
fn shared_answer_follows_the_binding() {
    let (fs, journal) = setup(true);
    let mut reader = fs.open("ctl", OpenFlags::READ).expect("open");
    fs.open("ctl", OpenFlags::WRITE)
        .expect("open")
        .write(b"status\n")
        .expect("write");
    assert_eq!(reader.read_to_end(16).expect("read"), b"ran status\0");
    reader.close();
    assert_eq!(journal.slot.get(), "ran status");
}

#[test]
fn read_write_session_sees_its_own_result() {
    let (fs, _journal) = setup(false);
    let mut file = fs.open("ctl", OpenFlags::READ_WRITE).expect("open");
    file.write(b"mark").expect("write");
    let mut out = [0u8; 16];
    let n = file.pread(&mut out, 0).expect("read");
    assert_eq!(&out[..n], b"ran mark\0");
}

#[test]
fn faulting_reader_reports_io() {
    let (fs, _journal) = setup(false);
    let mut file = fs.open("ctl", OpenFlags::READ).expect("open");
    let mut target = FaultingBuffer::new(8, 2);
    assert_eq!(file.read_user(&mut target, 8), Err(FsError::Io));
    assert_eq!(file.position(), 0);
}

#[test]
fn missing_state_fails_open() {
    let fs = SyntheticFs::new();
    CommandFile::new(Arc::new(()))
        .with_provider(|_: &()| -> Option<AnswerHandle> { None })
        .create(&fs, "empty", Mode::READ_ALL, None)
        .expect("create");
    assert_eq!(
        fs.open("empty", OpenFlags::READ).map(|_| ()),
        Err(FsError::InvalidState)
    );
}

#[test]
fn handlerless_file_rejects_writes_and_unbound_reads() {
    let fs = SyntheticFs::new();
    CommandFile::new(Arc::new(()))
        .create(&fs, "inert", Mode::CONTROL, None)
        .expect("create");
    let mut file = fs.open("inert", OpenFlags::READ_WRITE).expect("open");
    assert_eq!(file.write(b"reset"), Err(FsError::Unsupported));
    let mut out = [0u8; 4];
    assert_eq!(file.read(&mut out), Err(FsError::InvalidArgument));
}

#[test]
fn bindings_stay_with_their_files() {
    let fs = SyntheticFs::new();
    let first = Arc::new(Journal::default());
    let second = Arc::new(Journal::default());
    for (name, journal) in [("one", &first), ("two", &second)] {
        CommandFile::new(Arc::clone(journal))
            .with_handler(record)
            .create(&fs, name, Mode::CONTROL, None)
            .expect("create");
    }
    fs.open("two", OpenFlags::WRITE)
        .expect("open")
        .write(b"hello")
        .expect("write");
    assert!(first.commands().is_empty());
    assert_eq!(second.commands(), vec!["hello"]);
}
