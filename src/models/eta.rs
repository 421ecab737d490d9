use crate::models::TimeBin;
use serde::Serialize;
use time::OffsetDateTime;

/// Travel time for one directed pair of locations departing in one bin.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EtaCell {
    pub from_index: usize,
    pub to_index: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub time_bin_start: OffsetDateTime,
    pub duration_seconds: u32,
    pub has_incident: bool,
    pub is_fallback_estimate: bool,
}

/// Value produced for a single slot while building a matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellEstimate {
    pub duration_seconds: u32,
    pub has_incident: bool,
    pub is_fallback_estimate: bool,
}

/// A leg looked up for a concrete departure instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub duration_seconds: u32,
    pub has_incident: bool,
    /// True when the cell was itself a fallback, or when the departure fell
    /// outside the bins and the nearest bin was used instead.
    pub is_fallback_estimate: bool,
}

/// Dense, time-binned travel-time matrix.
///
/// Location 0 is the trip start; location `i + 1` is stop `i`. Every ordered
/// pair of distinct locations has exactly one cell per bin. The only way to
/// build one is [`EtaMatrix::from_fn`], which materialises every slot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EtaMatrix {
    location_count: usize,
    bins: Vec<TimeBin>,
    cells: Vec<EtaCell>,
}

impl EtaMatrix {
    /// Build a matrix by asking `estimate` for every (from, to, bin) slot.
    pub fn from_fn<F>(location_count: usize, bins: Vec<TimeBin>, mut estimate: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> CellEstimate,
    {
        let mut cells = Vec::with_capacity(Self::slot_count(location_count, bins.len()));
        for (bin_index, bin) in bins.iter().enumerate() {
            for from in 0..location_count {
                for to in 0..location_count {
                    if from == to {
                        continue;
                    }
                    let value = estimate(from, to, bin_index);
                    cells.push(EtaCell {
                        from_index: from,
                        to_index: to,
                        time_bin_start: bin.start,
                        duration_seconds: value.duration_seconds,
                        has_incident: value.has_incident,
                        is_fallback_estimate: value.is_fallback_estimate,
                    });
                }
            }
        }

        EtaMatrix {
            location_count,
            bins,
            cells,
        }
    }

    /// Number of cells a complete matrix holds.
    pub fn slot_count(location_count: usize, bin_count: usize) -> usize {
        bin_count * location_count * location_count.saturating_sub(1)
    }

    fn slot_index(&self, from: usize, to: usize, bin: usize) -> Option<usize> {
        let n = self.location_count;
        if from == to || from >= n || to >= n || bin >= self.bins.len() {
            return None;
        }
        let column = if to < from { to } else { to - 1 };
        Some(bin * n * (n - 1) + from * (n - 1) + column)
    }

    pub fn location_count(&self) -> usize {
        self.location_count
    }

    pub fn bins(&self) -> &[TimeBin] {
        &self.bins
    }

    pub fn cells(&self) -> &[EtaCell] {
        &self.cells
    }

    pub fn cell(&self, from: usize, to: usize, bin: usize) -> Option<&EtaCell> {
        self.slot_index(from, to, bin).and_then(|i| self.cells.get(i))
    }

    /// Bin holding `departure`, clamped to the nearest bin when outside.
    /// The flag is false when clamping happened.
    pub fn bin_for(&self, departure: OffsetDateTime) -> Option<(usize, bool)> {
        let first = self.bins.first()?;
        let last_index = self.bins.len() - 1;
        let offset_seconds = (departure - first.start).whole_seconds();
        let bin_seconds = crate::constants::TIME_BIN_MINUTES * 60;
        let raw = offset_seconds.div_euclid(bin_seconds);

        if raw < 0 {
            Some((0, false))
        } else if raw as usize > last_index {
            Some((last_index, false))
        } else {
            Some((raw as usize, true))
        }
    }

    /// Travel leg from `from` to `to` when leaving at `departure`.
    pub fn leg(&self, from: usize, to: usize, departure: OffsetDateTime) -> Option<Leg> {
        let (bin, in_coverage) = self.bin_for(departure)?;
        let cell = self.cell(from, to, bin)?;
        Some(Leg {
            duration_seconds: cell.duration_seconds,
            has_incident: cell.has_incident,
            is_fallback_estimate: cell.is_fallback_estimate || !in_coverage,
        })
    }

    pub fn fallback_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_fallback_estimate).count()
    }

    pub fn incident_count(&self) -> usize {
        self.cells.iter().filter(|c| c.has_incident).count()
    }
}
