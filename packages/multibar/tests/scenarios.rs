use std::sync::Arc;
use std::time::Duration;

use multibar::{Canvas, MultiBar, MultiBarError};
use progress_bar::{BarOptions, BarState, ProgressBar, RuleSet};
use worker_pool::{PoolConfig, PoolError, Reporter, WorkerPool};

fn bars(count: usize) -> Vec<ProgressBar> {
    let rules = Arc::new(RuleSet::default());
    let options = BarOptions {
        width: 10,
        ..BarOptions::default()
    };
    (0..count)
        .map(|_| ProgressBar::new(rules.clone(), options.clone()))
        .collect()
}

fn items(total: u64, reporter: Reporter) -> anyhow::Result<u64> {
    reporter.send(format!("processing total of {total}"));
    for index in 0..total {
        reporter.send(format!("processed item {index}"));
    }
    Ok(total)
}

fn rendered(multibar: &MultiBar<ProgressBar, Vec<u8>>) -> String {
    String::from_utf8_lossy(multibar.canvas().get_ref()).into_owned()
}

#[tokio::test]
async fn three_workers_finish_with_complete_block() {
    let mut pool = WorkerPool::new(vec![10u64; 3], items, PoolConfig::default());
    let mut multibar = MultiBar::with_canvas(bars(3), Canvas::new(Vec::new(), true));

    let results = multibar.execute(&mut pool).await.unwrap();

    assert_eq!(results, vec![10, 10, 10]);
    assert!(multibar.bars().iter().all(|bar| bar.is_complete()));
    assert!(multibar.bars().iter().all(|bar| bar.count() == 10));
    // Closing the block parks the cursor on the row below it.
    assert_eq!(multibar.canvas().current(), 3);
    assert!(!multibar.canvas().is_cursor_hidden());

    let out = rendered(&multibar);
    assert!(out.starts_with("\x1b[?25l"));
    assert!(out.ends_with("\x1b[?25h"));

    // The final forced block is the last three lines written before the
    // cursor leaves it.
    let block: Vec<&str> = out
        .rsplit("\x1b[?25h")
        .nth(1)
        .unwrap()
        .trim_end_matches('\n')
        .rsplit("\x1b[K")
        .take(3)
        .collect();
    assert_eq!(block.len(), 3);
    assert!(block.iter().all(|line| line.contains("100% 10/10")), "{block:?}");
}

#[tokio::test]
async fn captured_output_gets_only_the_final_block() {
    let mut pool = WorkerPool::new(vec![4u64, 2], items, PoolConfig::default());
    let mut multibar = MultiBar::with_canvas(bars(2), Canvas::new(Vec::new(), false));

    multibar.execute(&mut pool).await.unwrap();

    let out = rendered(&multibar);
    assert_eq!(out.matches("\x1b[K").count(), 2);
    assert!(!out.contains("\x1b[?25"));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("4/4"));
    assert!(lines[1].contains("2/2"));
}

#[tokio::test]
async fn silent_worker_still_completes_with_duration() {
    let mut pool = WorkerPool::new(
        vec![true, false],
        |talk: bool, reporter: Reporter| {
            if talk {
                reporter.send("processing total of 1");
                reporter.send("processed item 0");
            } else {
                reporter.send("nothing the rules know about");
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        },
        PoolConfig::default(),
    );
    let mut multibar = MultiBar::with_canvas(bars(2), Canvas::new(Vec::new(), true));

    multibar.execute(&mut pool).await.unwrap();

    let silent = &multibar.bars()[1];
    assert!(silent.is_complete());
    assert_eq!(silent.count(), 0);
    assert!(silent.duration().is_some());
    assert!(multibar.canvas().is_drawn(worker_pool::Offset(1)));
}

#[tokio::test]
async fn reset_tokens_drive_queue_style_workers() {
    let mut pool = WorkerPool::new(
        vec![(); 2],
        |_, reporter: Reporter| {
            for _ in 0..2 {
                reporter.send("processing total of 3");
                for index in 0..3 {
                    reporter.send(format!("processed item {index}"));
                }
                reporter.send("reset-mppbar");
            }
            reporter.send("reset-mppbar-complete");
            Ok(())
        },
        PoolConfig::default(),
    );
    let mut multibar = MultiBar::with_canvas(bars(2), Canvas::new(Vec::new(), false));

    multibar.execute(&mut pool).await.unwrap();

    for bar in multibar.bars() {
        assert!(bar.is_complete());
        assert_eq!(bar.total(), None);
        assert_eq!(bar.count(), 0);
    }
}

#[tokio::test]
async fn marker_lines_land_on_their_worker() {
    let mut pool = WorkerPool::new(
        vec![(); 3],
        |_, reporter: Reporter| {
            if reporter.offset().index() == 0 {
                reporter.send_unattributed("#2-processor is Hopper");
            }
            Ok(())
        },
        PoolConfig::default(),
    );
    let mut multibar = MultiBar::with_canvas(bars(3), Canvas::new(Vec::new(), false));

    multibar.execute(&mut pool).await.unwrap();

    assert_eq!(multibar.bars()[2].alias(), Some("Hopper"));
    assert_eq!(multibar.bars()[0].alias(), None);
}

#[tokio::test]
async fn failed_run_still_restores_terminal() {
    let mut pool = WorkerPool::new(
        vec![0u64, 1],
        |item, reporter: Reporter| {
            reporter.send("processing total of 5");
            if item == 1 {
                anyhow::bail!("worker gave up");
            }
            Ok(item)
        },
        PoolConfig::default(),
    );
    let mut multibar = MultiBar::with_canvas(bars(2), Canvas::new(Vec::new(), true));

    let err = multibar.execute(&mut pool).await.unwrap_err();

    assert!(matches!(
        err,
        MultiBarError::Pool(PoolError::WorkerFailed { .. })
    ));
    assert!(!multibar.canvas().is_cursor_hidden());
    assert!(rendered(&multibar).ends_with("\x1b[?25h"));
    assert!(multibar.bars().iter().all(|bar| bar.duration().is_some()));
}

#[tokio::test]
async fn interrupted_run_still_restores_terminal() {
    let mut pool = WorkerPool::new(
        vec![(); 2],
        |_, reporter: Reporter| {
            reporter.send("processing total of 100");
            while !reporter.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        },
        PoolConfig::default(),
    );
    let cancel = pool.cancellation();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });
    let mut multibar = MultiBar::with_canvas(bars(2), Canvas::new(Vec::new(), true));

    let err = multibar.execute(&mut pool).await.unwrap_err();

    assert!(matches!(err, MultiBarError::Pool(PoolError::Interrupted)));
    assert!(!multibar.canvas().is_cursor_hidden());
    assert!(rendered(&multibar).ends_with("\x1b[?25h"));
    assert!(multibar.bars().iter().all(|bar| !bar.is_complete()));
}
