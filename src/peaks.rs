use tracing::debug;

use crate::spectrogram::Spectrogram;

/// A salient time-frequency point: a spectrogram cell above the amplitude
/// threshold that strictly exceeds its four axis-aligned neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub freq_bin: u16,
    pub time_bin: u32,
    pub amp_db: f32,
}

/// Extract peaks from a spectrogram.
///
/// Only interior cells are considered; boundary rows and columns never yield
/// peaks. The neighbourhood check is deliberately 4-connected (diagonals are
/// not compared) to keep peak density reproducible against the indexed
/// corpus. The result is ordered by time bin ascending, frequency bin
/// ascending, which the scan order produces directly.
pub fn find_peaks(spectrogram: &Spectrogram, threshold_db: f32) -> Vec<Peak> {
    let frames = spectrogram.frames();
    let bins = spectrogram.bins();
    let mut peaks = Vec::new();

    if frames < 3 || bins < 3 {
        return peaks;
    }

    let mag = &spectrogram.mag_db;
    for t in 1..frames - 1 {
        for f in 1..bins - 1 {
            let cell = mag[t][f];
            if cell <= threshold_db {
                continue;
            }
            let is_peak = cell > mag[t][f - 1]
                && cell > mag[t][f + 1]
                && cell > mag[t - 1][f]
                && cell > mag[t + 1][f];
            if is_peak {
                peaks.push(Peak {
                    freq_bin: f as u16,
                    time_bin: t as u32,
                    amp_db: cell,
                });
            }
        }
    }

    debug!(count = peaks.len(), threshold_db, "extracted peaks");
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    // Build a spectrogram directly from a frame-major grid; axes are not
    // consulted by the picker.
    fn grid(mag_db: Vec<Vec<f32>>) -> Spectrogram {
        let bins = mag_db.first().map_or(0, |row| row.len());
        let frames = mag_db.len();
        Spectrogram {
            mag_db,
            freqs: vec![0.0; bins],
            times: vec![0.0; frames],
        }
    }

    #[test]
    fn finds_an_isolated_maximum() {
        let mut cells = vec![vec![-80.0; 5]; 5];
        cells[2][3] = -10.0;
        let peaks = find_peaks(&grid(cells), -40.0);
        assert_eq!(
            peaks,
            vec![Peak {
                freq_bin: 3,
                time_bin: 2,
                amp_db: -10.0
            }]
        );
    }

    #[test]
    fn boundary_cells_never_qualify() {
        let mut cells = vec![vec![-80.0; 5]; 5];
        cells[0][2] = 0.0;
        cells[4][2] = 0.0;
        cells[2][0] = 0.0;
        cells[2][4] = 0.0;
        assert!(find_peaks(&grid(cells), -40.0).is_empty());
    }

    #[test]
    fn threshold_excludes_quiet_maxima() {
        let mut cells = vec![vec![-80.0; 5]; 5];
        cells[2][2] = -50.0;
        assert!(find_peaks(&grid(cells), -40.0).is_empty());
        assert_eq!(find_peaks(&grid_with_center(-50.0), -60.0).len(), 1);
    }

    fn grid_with_center(center: f32) -> Spectrogram {
        let mut cells = vec![vec![-80.0; 5]; 5];
        cells[2][2] = center;
        grid(cells)
    }

    #[test]
    fn plateaus_are_not_peaks() {
        // Equal axis-aligned neighbour defeats the strict comparison.
        let mut cells = vec![vec![-80.0; 5]; 5];
        cells[2][2] = -10.0;
        cells[2][3] = -10.0;
        assert!(find_peaks(&grid(cells), -40.0).is_empty());
    }

    #[test]
    fn diagonal_neighbours_are_ignored() {
        // A louder diagonal neighbour on the boundary does not disqualify the
        // centre; 4-connectivity by design.
        let mut cells = vec![vec![-80.0; 5]; 5];
        cells[2][2] = -10.0;
        cells[1][1] = -5.0;
        let peaks = find_peaks(&grid(cells), -40.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].time_bin, peaks[0].freq_bin), (2, 2));
    }

    #[test]
    fn output_is_time_major_ordered() {
        let mut cells = vec![vec![-80.0; 7]; 7];
        cells[4][2] = -10.0;
        cells[1][5] = -10.0;
        cells[1][1] = -10.0;
        let peaks = find_peaks(&grid(cells), -40.0);
        let order: Vec<(u32, u16)> = peaks.iter().map(|p| (p.time_bin, p.freq_bin)).collect();
        assert_eq!(order, vec![(1, 1), (1, 5), (4, 2)]);
    }

    #[test]
    fn tiny_spectrograms_yield_nothing() {
        assert!(find_peaks(&grid(vec![vec![0.0; 5]; 2]), -40.0).is_empty());
        assert!(find_peaks(&grid(vec![]), -40.0).is_empty());
    }
}
