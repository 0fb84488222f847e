use rand::Rng;
use tracing::{debug, warn};

use minesweeper_common::models::{CellValue, GameParams, Pos};

use crate::{
    data::{Field, Grid, Mask, neighbors},
    error::{GameError, Result},
};

/// Result of revealing one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Every cell uncovered by this reveal, in visiting order. Empty when the
    /// target was already revealed.
    Cleared(Vec<Pos>),
    /// The reveal reached a mine; cells uncovered before it stay revealed.
    Detonated(Pos),
}

/// A field together with the player's revealed and flag masks.
#[derive(Debug, Clone)]
pub struct Board {
    field: Field,
    revealed: Mask,
    flags: Mask,
    mines: usize,
}

/// Largest field a session may hold, counted in cells.
pub const MAX_CELLS: usize = 250_000;

/// Checks that a field of these dimensions can be dealt. Returns its cell count.
pub fn validate_params(params: &GameParams) -> Result<usize> {
    if params.rows == 0 || params.cols == 0 {
        return Err(GameError::EmptyField);
    }
    let cells = params
        .cells()
        .filter(|cells| *cells <= MAX_CELLS)
        .ok_or(GameError::FieldTooLarge {
            rows: params.rows,
            cols: params.cols,
            max: MAX_CELLS,
        })?;
    if params.mines > cells {
        return Err(GameError::TooManyMines {
            mines: params.mines,
            cells,
        });
    }
    Ok(cells)
}

/// Selection sampling: every cell becomes a mine with probability
/// `mines_left / cells_left`, which yields a uniform subset of exactly
/// `params.mines` cells.
fn generate_mines(cells: usize, mine_count: usize, rng: &mut impl Rng) -> Vec<bool> {
    let mut mines = Vec::with_capacity(cells);

    let mut mines_left = mine_count;
    for cells_left in (1..=cells).rev() {
        let value = mines_left > 0 && rng.random_range(0..cells_left) < mines_left;
        mines.push(value);
        if value {
            mines_left -= 1;
        }
    }

    mines
}

fn count_adjacent_mines(mines: &Grid<bool>, pos: Pos) -> u8 {
    neighbors(pos, mines.rows(), mines.cols())
        .filter(|other| mines[*other])
        .count() as u8
}

fn field_from_mask(mines: &Grid<bool>) -> Field {
    let cells = mines
        .iter()
        .map(|(pos, mine)| {
            if *mine {
                CellValue::Mine
            } else {
                CellValue::Adjacent(count_adjacent_mines(mines, pos))
            }
        })
        .collect();

    Grid::from_cells(mines.rows(), mines.cols(), cells)
}

impl Board {
    /// Deals a random field. Fails when the mines do not fit.
    pub fn generate(params: GameParams, rng: &mut impl Rng) -> Result<Self> {
        let cells = validate_params(&params)?;
        let mines = Grid::from_cells(
            params.rows,
            params.cols,
            generate_mines(cells, params.mines, rng),
        );
        Ok(Self::from_field(field_from_mask(&mines)))
    }

    /// Builds a board with mines at exactly the given positions.
    pub fn with_mines(rows: usize, cols: usize, positions: &[Pos]) -> Result<Self> {
        validate_params(&GameParams {
            rows,
            cols,
            mines: positions.len(),
        })?;

        let mut mines = Grid::filled(rows, cols, false);
        for pos in positions {
            if !mines.contains(*pos) {
                return Err(GameError::InvalidCoords {
                    row: pos.row,
                    col: pos.col,
                });
            }
            mines[*pos] = true;
        }
        Ok(Self::from_field(field_from_mask(&mines)))
    }

    fn from_field(field: Field) -> Self {
        let (rows, cols) = (field.rows(), field.cols());
        let mines = field.count(|cell| cell.is_mine());
        Self {
            field,
            revealed: Grid::filled(rows, cols, false),
            flags: Grid::filled(rows, cols, false),
            mines,
        }
    }

    pub fn rows(&self) -> usize {
        self.field.rows()
    }

    pub fn cols(&self) -> usize {
        self.field.cols()
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn revealed(&self) -> &Mask {
        &self.revealed
    }

    pub fn flags(&self) -> &Mask {
        &self.flags
    }

    fn validate_pos(&self, pos: Pos) -> Result<()> {
        if self.field.contains(pos) {
            Ok(())
        } else {
            warn!("Invalid position: ({}, {})", pos.row, pos.col);
            Err(GameError::InvalidCoords {
                row: pos.row,
                col: pos.col,
            })
        }
    }

    /// Reveals `pos`, cascading through zero cells depth-first in row-major
    /// neighbor order. Stops at the first mine it reaches.
    pub fn reveal(&mut self, pos: Pos) -> Result<RevealOutcome> {
        self.validate_pos(pos)?;

        let (rows, cols) = (self.rows(), self.cols());
        let mut cleared = Vec::new();
        let mut pending = vec![pos];

        while let Some(pos) = pending.pop() {
            if self.revealed[pos] {
                continue;
            }
            self.revealed[pos] = true;

            match self.field[pos] {
                CellValue::Mine => {
                    debug!("Reveal reached mine at ({}, {})", pos.row, pos.col);
                    return Ok(RevealOutcome::Detonated(pos));
                }
                CellValue::Adjacent(0) => {
                    cleared.push(pos);
                    let next: Vec<Pos> = neighbors(pos, rows, cols)
                        .filter(|other| !self.revealed[*other])
                        .collect();
                    pending.extend(next.into_iter().rev());
                }
                CellValue::Adjacent(_) => cleared.push(pos),
            }
        }

        Ok(RevealOutcome::Cleared(cleared))
    }

    /// Flips the flag at `pos` and returns whether it is now flagged.
    pub fn toggle_flag(&mut self, pos: Pos) -> Result<bool> {
        self.validate_pos(pos)?;
        let flag = &mut self.flags[pos];
        *flag = !*flag;
        Ok(*flag)
    }

    /// Mine count minus placed flags. Negative when over-flagged.
    pub fn mines_remaining(&self) -> i64 {
        self.mines as i64 - self.flags.count(|flag| *flag) as i64
    }

    /// Won once every safe cell is revealed and every mine is flagged.
    pub fn is_won(&self) -> bool {
        self.field.iter().all(|(pos, cell)| {
            if cell.is_mine() {
                self.flags[pos]
            } else {
                self.revealed[pos]
            }
        })
    }
}
