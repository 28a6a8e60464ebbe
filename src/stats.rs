use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

/// 流水线共享统计
///
/// 所有Worker只能通过 `record_*` 原子递增计数器；
/// 等所有Worker退出后再通过 [`PipelineStats::snapshot`] 读取最终结果。
#[derive(Debug)]
pub struct PipelineStats {
    total_files: usize,
    processed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    dry_run_hits: AtomicUsize,
}

impl PipelineStats {
    /// 创建统计对象，总文件数只在此处设置一次
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            processed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            dry_run_hits: AtomicUsize::new(0),
        }
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dry_run(&self) {
        self.dry_run_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取当前计数
    ///
    /// 等待Worker全部join之后调用，结果是确定的
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_files: self.total_files,
            processed: self.processed.load(Ordering::Acquire),
            skipped: self.skipped.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            dry_run_hits: self.dry_run_hits.load(Ordering::Acquire),
        }
    }
}

/// 统计结果的只读快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub total_files: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run_hits: usize,
}

impl StatsSnapshot {
    /// 已到达终态的任务数
    pub fn accounted(&self) -> usize {
        self.processed + self.skipped + self.failed + self.dry_run_hits
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// 一次完整运行的总结报告
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stats: StatsSnapshot,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl RunReport {
    pub fn new(stats: StatsSnapshot, started_at: DateTime<Local>, elapsed: Duration, dry_run: bool) -> Self {
        Self {
            stats,
            started_at,
            elapsed,
            dry_run,
        }
    }

    /// 进程退出码：有任何失败即为 1
    pub fn exit_code(&self) -> i32 {
        if self.stats.has_failures() {
            1
        } else {
            0
        }
    }
}

/// 打印翻译任务总结
pub fn print_summary(report: &RunReport) {
    let stats = &report.stats;

    println!("\n📊 翻译任务总结:");
    println!("═══════════════════════════════════════");
    println!("   开始时间:            {}", report.started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("   发现文件总数:        {}", stats.total_files);
    if report.dry_run {
        println!("   处理文件数 (空跑):   {}", stats.dry_run_hits);
    } else {
        println!("   成功处理文件数:      {}", stats.processed);
        println!("   跳过文件数 (已存在): {}", stats.skipped);
    }
    println!("   失败文件数:          {}", stats.failed);
    println!("   总耗时:              {}", format_duration(report.elapsed));

    if !report.dry_run && stats.processed > 0 {
        let secs = report.elapsed.as_secs_f64().max(f64::EPSILON);
        println!("   处理速度:            {:.2} 文件/秒", stats.processed as f64 / secs);
    }
    println!("═══════════════════════════════════════");
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = PipelineStats::new(7);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_files, 7);
        assert_eq!(snapshot.accounted(), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = Arc::new(PipelineStats::new(4000));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        match i % 4 {
                            0 => stats.record_processed(),
                            1 => stats.record_skipped(),
                            2 => stats.record_failed(),
                            _ => stats.record_dry_run(),
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.processed, 1000);
        assert_eq!(snapshot.skipped, 1000);
        assert_eq!(snapshot.failed, 1000);
        assert_eq!(snapshot.dry_run_hits, 1000);
        assert_eq!(snapshot.accounted(), snapshot.total_files);
    }

    #[test]
    fn test_exit_code() {
        let mut snapshot = StatsSnapshot {
            total_files: 2,
            dry_run_hits: 2,
            ..Default::default()
        };
        let report = RunReport::new(snapshot, Local::now(), Duration::from_millis(5), true);
        assert_eq!(report.exit_code(), 0);

        snapshot.failed = 1;
        let report = RunReport::new(snapshot, Local::now(), Duration::from_millis(5), false);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_empty_run_summary() {
        let report = RunReport::new(StatsSnapshot::default(), Local::now(), Duration::ZERO, false);
        print_summary(&report);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.stats.accounted(), report.stats.total_files);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
    }
}
