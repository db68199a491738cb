//! Reading and writing positions in Tak Positional System notation, e.g.
//! `x4,1/x4,1/x3,2,1/x3,2,1/2,x3,1 1 6`

use board_game_traits::Color;

use crate::position::utils::color_digit;
use crate::position::{BoardConfig, Position, Role, Square, MAX_BOARD_SIZE};

impl Position {
    pub fn to_tps(&self) -> String {
        let size = self.size();
        let mut tps = String::new();
        for y in (0..size).rev() {
            let mut empties = 0;
            let mut first = true;
            let mut separator = |tps: &mut String| {
                if !first {
                    tps.push(',');
                }
                first = false;
            };
            for x in 0..size {
                let stack = self.at(x, y);
                if stack.is_empty() {
                    empties += 1;
                    continue;
                }
                if empties > 0 {
                    separator(&mut tps);
                    push_empties(&mut tps, empties);
                    empties = 0;
                }
                separator(&mut tps);
                let pieces: Vec<_> = stack.iter().collect();
                for piece in pieces.iter().rev() {
                    tps.push(color_digit(piece.color()));
                }
                match pieces[0].role() {
                    Role::Flat => (),
                    Role::Wall => tps.push('S'),
                    Role::Cap => tps.push('C'),
                }
            }
            if empties > 0 {
                separator(&mut tps);
                push_empties(&mut tps, empties);
            }
            if y > 0 {
                tps.push('/');
            }
        }
        tps.push_str(&format!(
            " {} {}",
            color_digit(self.to_move()),
            self.move_number() / 2 + 1
        ));
        tps
    }

    /// Parses a TPS string, using the standard reserves for the board size
    pub fn from_tps(tps: &str) -> Result<Self, pgn_traits::Error> {
        let mut words = tps.split_whitespace();
        let (Some(board), Some(to_move), Some(move_number), None) =
            (words.next(), words.next(), words.next(), words.next())
        else {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Couldn't parse TPS string \"{}\", expected 3 space-separated parts",
                tps
            )));
        };

        let rows: Vec<&str> = board.split('/').collect();
        let size = rows.len();
        if !(3..=MAX_BOARD_SIZE).contains(&size) {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Unsupported board size {} in TPS \"{}\"",
                size, tps
            )));
        }
        let size = size as u8;
        let mut position = Position::new(BoardConfig::new(size));

        for (row_index, row) in rows.iter().enumerate() {
            let y = size - 1 - row_index as u8;
            let mut x = 0u8;
            for token in row.split(',') {
                if let Some(count) = token.strip_prefix('x') {
                    let count = if count.is_empty() {
                        1
                    } else {
                        count.parse::<u8>().map_err(|err| {
                            pgn_traits::Error::new_caused_by(
                                pgn_traits::ErrorKind::ParseError,
                                format!("Bad empty square count \"{}\" in TPS", token),
                                err,
                            )
                        })?
                    };
                    x = x.saturating_add(count);
                } else {
                    if x >= size {
                        return Err(row_length_error(row, size));
                    }
                    position.set_stack(Square::new(x, y), token)?;
                    x += 1;
                }
                if x > size {
                    return Err(row_length_error(row, size));
                }
            }
            if x != size {
                return Err(row_length_error(row, size));
            }
        }

        let to_move = match to_move {
            "1" => Color::White,
            "2" => Color::Black,
            s => {
                return Err(pgn_traits::Error::new_parse_error(format!(
                    "Bad side to move \"{}\" in TPS, expected 1 or 2",
                    s
                )))
            }
        };
        let move_number: u16 = move_number.parse().map_err(|err| {
            pgn_traits::Error::new_caused_by(
                pgn_traits::ErrorKind::ParseError,
                format!("Bad move number \"{}\" in TPS", move_number),
                err,
            )
        })?;
        if move_number == 0 {
            return Err(pgn_traits::Error::new_parse_error(
                "TPS move number must be at least 1".to_string(),
            ));
        }
        position.ply = 2 * (move_number - 1)
            + match to_move {
                Color::White => 0,
                Color::Black => 1,
            };
        position.rebuild_caches();
        Ok(position)
    }

    /// Places a TPS stack token, such as `1212S`, on an empty square
    fn set_stack(&mut self, square: Square, token: &str) -> Result<(), pgn_traits::Error> {
        let (colors, role) = match token.strip_suffix('S') {
            Some(colors) => (colors, Role::Wall),
            None => match token.strip_suffix('C') {
                Some(colors) => (colors, Role::Cap),
                None => (token, Role::Flat),
            },
        };
        let colors = colors
            .chars()
            .map(|ch| match ch {
                '1' => Some(Color::White),
                '2' => Some(Color::Black),
                _ => None,
            })
            .collect::<Option<Vec<Color>>>()
            .filter(|colors| !colors.is_empty() && colors.len() < u8::MAX as usize)
            .ok_or_else(|| {
                pgn_traits::Error::new_parse_error(format!("Bad TPS square \"{}\"", token))
            })?;

        let i = square.index(self.size());
        let bit = 1 << i;
        let Some((&top_color, buried)) = colors.split_last() else {
            unreachable!()
        };
        for (depth, color) in buried.iter().rev().enumerate() {
            if *color == Color::Black && depth < 64 {
                self.stacks[i] |= 1 << depth;
            }
            self.take_from_reserve(*color, Role::Flat, token)?;
        }
        self.take_from_reserve(top_color, role, token)?;
        self.height[i] = colors.len() as u8;
        match top_color {
            Color::White => self.white |= bit,
            Color::Black => self.black |= bit,
        }
        match role {
            Role::Flat => (),
            Role::Wall => self.standing |= bit,
            Role::Cap => self.caps |= bit,
        }
        Ok(())
    }

    fn take_from_reserve(
        &mut self,
        color: Color,
        role: Role,
        token: &str,
    ) -> Result<(), pgn_traits::Error> {
        let reserve = match (role, color) {
            (Role::Cap, Color::White) => &mut self.white_caps,
            (Role::Cap, Color::Black) => &mut self.black_caps,
            (_, Color::White) => &mut self.white_stones,
            (_, Color::Black) => &mut self.black_stones,
        };
        *reserve = reserve.checked_sub(1).ok_or_else(|| {
            pgn_traits::Error::new_parse_error(format!(
                "TPS has more pieces than the reserves allow, at \"{}\"",
                token
            ))
        })?;
        Ok(())
    }
}

fn push_empties(tps: &mut String, empties: u8) {
    if empties == 1 {
        tps.push('x');
    } else {
        tps.push_str(&format!("x{}", empties));
    }
}

fn row_length_error(row: &str, size: u8) -> pgn_traits::Error {
    pgn_traits::Error::new_parse_error(format!(
        "TPS row \"{}\" does not have {} squares",
        row, size
    ))
}
