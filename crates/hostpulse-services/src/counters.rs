use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Instant;
use sysinfo::Networks;
use thiserror::Error;

const SECTOR_BYTES: u64 = 512;

// Partitions and device-mapper volumes repeat the I/O of their parent disk.
static PARTITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(dm-\d+|nvme\d+n\d+p\d+|mmcblk\d+p\d+|(?:s|v|xv)d[a-z]+\d+)$")
        .expect("invalid partition regex")
});

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CounterError>;

/// Cumulative byte counters at one instant. Counters only grow until reboot
/// or a driver reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub taken_at: Instant,
}

impl CounterSnapshot {
    pub fn now(net: ByteTotals, disk: ByteTotals) -> Self {
        Self {
            net_rx_bytes: net.incoming,
            net_tx_bytes: net.outgoing,
            disk_read_bytes: disk.incoming,
            disk_write_bytes: disk.outgoing,
            taken_at: Instant::now(),
        }
    }
}

/// A pair of cumulative byte counts: received/read and transmitted/written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteTotals {
    pub incoming: u64,
    pub outgoing: u64,
}

impl ByteTotals {
    fn add(self, incoming: u64, outgoing: u64) -> Self {
        Self {
            incoming: self.incoming.saturating_add(incoming),
            outgoing: self.outgoing.saturating_add(outgoing),
        }
    }
}

/// Received and transmitted bytes summed over every interface, loopback included
pub struct NetworkCounters {
    networks: Networks,
}

impl NetworkCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }

    pub fn read(&mut self) -> ByteTotals {
        self.networks.refresh(true);
        self.networks
            .iter()
            .fold(ByteTotals::default(), |sum, (_, data)| {
                sum.add(data.total_received(), data.total_transmitted())
            })
    }
}

impl Default for NetworkCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads disk totals from a procfs mount
#[derive(Debug, Clone)]
pub struct ProcCounters {
    root: PathBuf,
}

impl ProcCounters {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn read_disk(&self) -> Result<ByteTotals> {
        let path = self.root.join("diskstats");
        File::open(&path)
            .map(BufReader::new)
            .and_then(parse_diskstats)
            .map_err(|source| CounterError::Read { path, source })
    }
}

impl Default for ProcCounters {
    fn default() -> Self {
        Self::new("/proc")
    }
}

/// Sum bytes read and written over whole disks in `/proc/diskstats`
pub fn parse_diskstats<R: BufRead>(reader: R) -> io::Result<ByteTotals> {
    let mut totals = ByteTotals::default();

    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 || PARTITION_RE.is_match(parts[2]) {
            continue;
        }
        let read_sectors: u64 = parts[5].parse().unwrap_or(0);
        let written_sectors: u64 = parts[9].parse().unwrap_or(0);
        totals = totals.add(
            read_sectors.saturating_mul(SECTOR_BYTES),
            written_sectors.saturating_mul(SECTOR_BYTES),
        );
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    const DISKSTATS: &str = "259       0 nvme0n1 77558 2503 6796549 23757 210362 619 7160468 2434723 0 66868 2481326 3691 0 52413048 14264 4798 8581
259       1 nvme0n1p1 611 1645 12829 173 14 0 12 12 0 31 185 0 0 0 0 0 0
253       0 dm-0 77669 0 6779496 25570 210960 0 7160456 155272 0 72779 193537 3691 0 52413048 12695 0 0
8       0 sda 100 0 1000 0 100 0 1000 0 0 0 0
8       1 sda1 10 0 100 0 10 0 100 0 0 0 0
";

    #[test]
    fn test_diskstats_skips_partitions() {
        let totals = parse_diskstats(Cursor::new(DISKSTATS)).unwrap();
        assert_eq!(totals.incoming, (6_796_549 + 1000) * 512);
        assert_eq!(totals.outgoing, (7_160_468 + 1000) * 512);
    }

    #[test]
    fn test_diskstats_ignores_short_lines() {
        let totals = parse_diskstats(Cursor::new("8 0 sda 1 2 3\n\n")).unwrap();
        assert_eq!(totals, ByteTotals::default());
    }

    #[test]
    fn test_reads_proc_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("diskstats"), DISKSTATS).unwrap();

        let totals = ProcCounters::new(dir.path()).read_disk().unwrap();
        assert_eq!(totals.outgoing, 7_161_468 * 512);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProcCounters::new(dir.path()).read_disk().unwrap_err();
        let CounterError::Read { path, .. } = err;
        assert!(path.ends_with("diskstats"));
    }

    #[test]
    fn test_byte_totals_saturate() {
        let totals = ByteTotals::default().add(u64::MAX, 1).add(5, 2);
        assert_eq!(totals.incoming, u64::MAX);
        assert_eq!(totals.outgoing, 3);
    }

    #[test]
    fn test_network_totals_never_shrink_between_reads() {
        let mut network = NetworkCounters::new();
        let first = network.read();
        let second = network.read();
        assert!(second.incoming >= first.incoming);
        assert!(second.outgoing >= first.outgoing);
    }

    #[test]
    fn test_snapshot_maps_totals() {
        let snapshot = CounterSnapshot::now(
            ByteTotals { incoming: 1, outgoing: 2 },
            ByteTotals { incoming: 3, outgoing: 4 },
        );
        assert_eq!(snapshot.net_rx_bytes, 1);
        assert_eq!(snapshot.net_tx_bytes, 2);
        assert_eq!(snapshot.disk_read_bytes, 3);
        assert_eq!(snapshot.disk_write_bytes, 4);
    }
}
