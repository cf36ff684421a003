#[path = "common/mod.rs"]
mod common;

use common::*;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use subcrawl::{
    Checkpoint, Checkpointer, CollectionDriver, CrawlOptions, RecordStore, StopReason, AUTHOR_TABLE,
    COMMENT_TABLE, GILDING_TABLE,
};

fn opts(checkpoint: u64, minimum: u64) -> CrawlOptions {
    CrawlOptions::new("rust")
        .with_checkpoint(checkpoint)
        .with_minimum(minimum)
        .with_progress(false)
}

/// Six submissions of two comments with checkpoint 3: the threshold goes 3 -> 6 -> 9 -> 12,
/// so flushes land at 4, 6, 10 and 12 comments, each writing all three tables in full.
#[test]
fn flushes_follow_moving_threshold() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(3, 100).with_final_flush(false), &mut sink).unwrap();

    let summary = driver.run(uniform_feed(6, 2, &expansions)).unwrap();
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(summary.comments, 12);
    assert_eq!(summary.flushes, 4);
    drop(driver);

    assert_eq!(sink.comment_flush_sizes(), vec![4, 6, 10, 12]);
    assert_eq!(sink.writes.len(), 12, "three tables per flush");
    for chunk in sink.writes.chunks(3) {
        let names: Vec<&str> = chunk.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, [COMMENT_TABLE, AUTHOR_TABLE, GILDING_TABLE]);
        // every comment has its own author in this feed
        assert_eq!(chunk[0].rows.len(), chunk[1].rows.len());
        assert!(chunk[2].rows.is_empty());
    }
}

/// Checkpointer in isolation: below threshold nothing happens, crossing it flushes once
/// and moves the threshold up by exactly one interval.
#[test]
fn checkpointer_advances_by_one_interval() {
    let mut store = RecordStore::new();
    let mut cp = Checkpointer::new(RecordingSink::default(), 2, 10).unwrap();
    let mut ing = subcrawl::CommentIngester::new(subcrawl::AuthorResolver::new());

    ing.ingest(&mut store, &comment("c1", "x", "a"));
    assert_eq!(cp.after_submission(&store).unwrap(), Checkpoint::Continue);
    assert_eq!(cp.flushes(), 0);

    for i in 2..=5 {
        ing.ingest(&mut store, &comment(&format!("c{i}"), "x", "a"));
    }
    // 5 comments jump past 2 and 4; the threshold still moves only to 4
    assert_eq!(cp.after_submission(&store).unwrap(), Checkpoint::Continue);
    assert_eq!(cp.flushes(), 1);
    assert_eq!(cp.threshold(), 4);

    // next call flushes again because 5 >= 4
    cp.after_submission(&store).unwrap();
    assert_eq!(cp.flushes(), 2);
    assert_eq!(cp.threshold(), 6);
    assert_eq!(cp.sink().comment_flush_sizes(), vec![5, 5]);
}

/// With checkpoint 2 and minimum 5, the third two-comment submission pushes the count to 6 > 5:
/// the run stops there and the remaining submissions are never expanded.
#[test]
fn stops_after_minimum_is_exceeded() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(2, 5), &mut sink).unwrap();

    let summary = driver.run(uniform_feed(10, 2, &expansions)).unwrap();
    assert_eq!(summary.stop_reason, StopReason::MinimumReached);
    assert_eq!(summary.submissions, 3);
    assert_eq!(summary.comments, 6);
    assert_eq!(expansions.get(), 3);
    drop(driver);

    // flushes at 2, 4 and 6; the final flush has nothing new to write
    assert_eq!(sink.comment_flush_sizes(), vec![2, 4, 6]);
}

/// Reaching exactly `minimum` is not enough to stop.
#[test]
fn reaching_minimum_exactly_does_not_stop() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(2, 4), &mut sink).unwrap();

    let summary = driver.run(uniform_feed(2, 2, &expansions)).unwrap();
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(summary.comments, 4);
}

fn feed_4_1_1(expansions: &Rc<Cell<usize>>) -> Vec<MemSubmission> {
    let big = (0..4).map(|i| comment(&format!("a{i}"), "x", &format!("u{i}"))).collect();
    vec![
        submission("s1", big, expansions),
        submission("s2", vec![comment("b0", "x", "v0")], expansions),
        submission("s3", vec![comment("b1", "x", "v1")], expansions),
        submission("s4", vec![comment("b2", "x", "v2")], expansions),
    ]
}

/// Minimum crossed between checkpoints (4 -> flush, threshold 8; stop at 6):
/// the final flush writes the 2 comments collected since.
#[test]
fn final_flush_covers_comments_after_last_checkpoint() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(4, 5), &mut sink).unwrap();

    let summary = driver.run(feed_4_1_1(&expansions)).unwrap();
    assert_eq!(summary.stop_reason, StopReason::MinimumReached);
    assert_eq!(summary.comments, 6);
    assert_eq!(summary.flushes, 2);
    drop(driver);

    assert_eq!(sink.comment_flush_sizes(), vec![4, 6]);
    assert_eq!(sink.last(AUTHOR_TABLE).unwrap().rows.len(), 6);
}

/// Same run with the final flush disabled: disk only holds the 4-comment checkpoint.
#[test]
fn without_final_flush_only_checkpoints_are_written() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(4, 5).with_final_flush(false), &mut sink).unwrap();

    driver.run(feed_4_1_1(&expansions)).unwrap();
    drop(driver);
    assert_eq!(sink.comment_flush_sizes(), vec![4]);
}

/// A submission id seen twice is expanded once; tables match a feed without the repeat.
#[test]
fn repeated_submission_is_processed_once() {
    let expansions = Rc::new(Cell::new(0));
    let s1 = vec![comment("c1", "x", "a"), gilded(comment("c2", "y", "b"), &[("gid_1", 1)])];
    let s2 = vec![comment("c3", "z", "a")];

    let mut twice = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(100, 1000), &mut twice).unwrap();
    driver
        .run(vec![
            submission("s1", s1.clone(), &expansions),
            submission("s1", s1.clone(), &expansions),
            submission("s2", s2.clone(), &expansions),
        ])
        .unwrap();
    let (store_twice, _) = driver.into_parts();
    assert_eq!(expansions.get(), 2);

    let once_expansions = Rc::new(Cell::new(0));
    let mut once = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(100, 1000), &mut once).unwrap();
    driver
        .run(vec![submission("s1", s1, &once_expansions), submission("s2", s2, &once_expansions)])
        .unwrap();
    let (store_once, _) = driver.into_parts();

    assert_eq!(store_twice.comments(), store_once.comments());
    assert_eq!(store_twice.authors(), store_once.authors());
    assert_eq!(store_twice.gildings(), store_once.gildings());
    assert_eq!(store_twice.submission_count(), 2);
}

/// A thread that fails to expand is marked seen, contributes nothing, and the run goes on.
#[test]
fn failed_expansion_skips_only_that_submission() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(100, 1000), &mut sink).unwrap();

    let mut broken = failing_submission("s1", &expansions);
    assert_eq!(driver.process(&mut broken).unwrap(), Some(Checkpoint::Continue));
    assert_eq!(driver.process(&mut broken).unwrap(), None);
    let summary = driver
        .run(vec![submission("s2", vec![comment("c1", "x", "a")], &expansions)])
        .unwrap();

    assert_eq!(summary.submissions, 2);
    assert_eq!(summary.comments, 1);
}

/// checkpoint=5000 with minimum=1000 is rejected before anything is collected or written.
#[test]
fn minimum_below_checkpoint_is_rejected() {
    let mut sink = RecordingSink::default();
    let err = CollectionDriver::new(&opts(5000, 1000), &mut sink).err().expect("must fail");
    assert!(err.to_string().contains("minimum"), "unexpected error: {err}");
    assert!(sink.writes.is_empty());

    assert!(Checkpointer::new(RecordingSink::default(), 5000, 1000).is_err());
    assert!(opts(0, 1000).validate().is_err());
    assert!(CrawlOptions::new("  ").with_progress(false).validate().is_err());
    assert!(opts(1000, 1000).validate().is_ok());
}

#[test]
fn defaults_match_documented_values() {
    let o = CrawlOptions::new("r/Rust");
    assert_eq!(o.subreddit, "rust");
    assert_eq!(o.checkpoint, 10_000);
    assert_eq!(o.minimum, 200_000);
    assert!(o.final_flush);
    assert!(o.validate().is_ok());
}

/// A cancelled run processes no further submissions but still saves what it has.
#[test]
fn cancel_flag_stops_before_next_submission() {
    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(100, 1000), &mut sink).unwrap();

    let mut first = submission("s0", vec![comment("c1", "x", "a")], &expansions);
    driver.process(&mut first).unwrap();
    driver.cancel_handle().store(true, Ordering::Relaxed);

    let summary = driver.run(uniform_feed(3, 2, &expansions)).unwrap();
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.comments, 1);
    assert_eq!(expansions.get(), 1);
    drop(driver);
    assert_eq!(sink.comment_flush_sizes(), vec![1]);
}

/// Both exits of the binary print the same status line: record count, outcome and elapsed hours.
#[test]
fn status_line_reports_count_and_elapsed_hours() {
    use std::time::Duration;

    let line = subcrawl::status_line(0, "invalid configuration: minimum below checkpoint", Duration::from_secs(0));
    assert_eq!(line, "Collected 0 records; invalid configuration: minimum below checkpoint. Total execution time: 0.00 hours");

    let expansions = Rc::new(Cell::new(0));
    let mut sink = RecordingSink::default();
    let mut driver = CollectionDriver::new(&opts(2, 5), &mut sink).unwrap();
    let mut summary = driver.run(uniform_feed(10, 2, &expansions)).unwrap();
    summary.elapsed = Duration::from_secs(5400);
    assert_eq!(summary.status_line(), "Collected 6 records; minimum reached. Total execution time: 1.50 hours");
}
