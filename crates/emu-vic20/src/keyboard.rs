//! VIC-20 keyboard matrix.
//!
//! The VIC-20 has an 8x8 keyboard matrix scanned through VIA2: port B
//! ($9120) drives the column select (active low) and port A ($9121)
//! reads the row result (active low: 0 = a key in a selected column and
//! that row is down).

/// 8x8 keyboard matrix.
///
/// Internally stores 1 = pressed per bit. `scan()` returns active-low
/// row data as seen on VIA2 port A.
pub struct KeyboardMatrix {
    /// Row state. `rows[r]` has bit `c` set if key (row=r, col=c) is down.
    rows: [u8; 8],
}

impl KeyboardMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self { rows: [0; 8] }
    }

    /// Press or release the key at the given matrix position.
    pub fn set_key(&mut self, row: u8, col: u8, pressed: bool) {
        if row < 8 && col < 8 {
            if pressed {
                self.rows[row as usize] |= 1 << col;
            } else {
                self.rows[row as usize] &= !(1 << col);
            }
        }
    }

    /// Scan the matrix with the given column select from VIA2 port B.
    ///
    /// `column_mask` is active low: a 0 bit selects that column. Returns
    /// active-low row data: a 0 bit means a key in a selected column of
    /// that row is down.
    #[must_use]
    pub fn scan(&self, column_mask: u8) -> u8 {
        let selected = !column_mask;
        let mut down: u8 = 0;
        for (row, &cols) in self.rows.iter().enumerate() {
            if cols & selected != 0 {
                down |= 1 << row;
            }
        }
        !down
    }

    /// Release every key.
    pub fn release_all(&mut self) {
        self.rows = [0; 8];
    }
}

impl Default for KeyboardMatrix {
    fn default() -> Self {
        Self::new()
    }
}
