use std::io;

use board_game_traits::Color;

use crate::evaluation::weights::{Feature, Weights, NUM_FEATURES};
use crate::evaluation::{terminal_value, Evaluator};
use crate::position::bitboard::{low_bits, popcount, BitIter, Constants};
use crate::position::{Position, Role};

/// Reserves below which top flats become more valuable
const ENDGAME_CUTOFF: i64 = 7;

/// Bonus for the side to move when it can complete a road next move
const IMMEDIATE_THREAT: i64 = 1 << 20;

/// Weighted contribution of each feature, for white and black
pub type Terms = [[i64; 2]; NUM_FEATURES];

/// Linear combination of hand-tuned position features
#[derive(Clone, Debug)]
pub struct WeightedEvaluator {
    size: u8,
    weights: Weights,
    regions: Vec<u64>,
}

impl WeightedEvaluator {
    pub fn new(size: u8, weights: Weights) -> Self {
        WeightedEvaluator {
            size,
            weights,
            regions: concentration_regions(size),
        }
    }

    pub fn default_for_size(size: u8) -> Self {
        Self::new(size, Weights::default_for_size(size))
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Fills `terms` for a game that is not over.
    /// Returns whether white and black have a road in one.
    pub fn score_terms(&self, position: &Position, terms: &mut Terms) -> (bool, bool) {
        debug_assert_eq!(position.size(), self.size);
        let w = &self.weights;
        let c = position.constants();
        let (white, black) = (position.white(), position.black());
        let (standing, caps) = (position.standing(), position.caps());
        let occupied = white | black;
        let mover = color_index(position.to_move());

        let left = (position.white_stones().min(position.black_stones()) as i64).min(ENDGAME_CUTOFF);
        let endgame_bonus = ((ENDGAME_CUTOFF - left) * w[Feature::EndgameFlat]) / ENDGAME_CUTOFF;
        terms[Feature::Tempo as usize][mover] +=
            (w[Feature::TopFlat] + endgame_bonus) / 2 + w[Feature::Tempo];

        for color in [Color::White, Color::Black] {
            let ci = color_index(color);
            let own = position.controlled_by(color);
            let opponent = position.controlled_by(!color);
            let top_flats = popcount(own & !(standing | caps)) as i64;
            terms[Feature::EndgameFlat as usize][ci] += top_flats * endgame_bonus;
            let mut add = |feature: Feature, count: i64| {
                terms[feature as usize][ci] += count * w[feature];
            };

            add(Feature::TopFlat, top_flats);
            add(Feature::Standing, popcount(own & standing) as i64);
            add(Feature::Capstone, popcount(own & caps) as i64);
            add(Feature::Center, popcount(own & !c.edge) as i64);

            let road = own & !standing;
            add(
                Feature::Liberties,
                popcount(c.grow(!opponent, road) & !own) as i64,
            );

            let groups = position.analysis().groups(color);
            let mut all_groups = 0;
            for &group in groups {
                let (width, height) = c.dimensions(group);
                add(Feature::group(width.max(height)), 1);
                all_groups |= group;
            }
            add(
                Feature::GroupLiberties,
                popcount(c.grow(!(opponent | standing), all_groups) & !all_groups) as i64,
            );
        }

        let white_road = white & !standing;
        let black_road = black & !standing;
        for &region in self.regions.iter() {
            let diff = popcount(region & white_road) as i64 - popcount(region & black_road) as i64;
            if diff > 0 {
                terms[Feature::Concentration as usize][0] += diff * w[Feature::Concentration];
            } else {
                terms[Feature::Concentration as usize][1] -= diff * w[Feature::Concentration];
            }
        }

        self.score_stacks(position, terms);

        let mut threats = (false, false);
        if w[Feature::Potential] != 0 || w[Feature::Threat] != 0 {
            let counts = count_threats(c, position);
            for ci in 0..2 {
                let (potential, threat) = counts[ci];
                terms[Feature::Potential as usize][ci] += potential as i64 * w[Feature::Potential];
                terms[Feature::Threat as usize][ci] += threat as i64 * w[Feature::Threat];
            }
            threats = (
                counts[0].0 + counts[0].1 > 0,
                counts[1].0 + counts[1].1 > 0,
            );
        }

        if w[Feature::EmptyControl] != 0 || w[Feature::FlatControl] != 0 {
            let control = compute_control(c, position);
            let empty = c.mask & !occupied;
            let flats = occupied & !(standing | caps);
            for ci in 0..2 {
                let mut add = |feature: Feature, bits: u64| {
                    terms[feature as usize][ci] += popcount(bits) as i64 * w[feature];
                };
                add(Feature::EmptyControl, control[ci] & empty);
                add(Feature::FlatControl, control[ci] & flats);
                add(Feature::CenterControl, control[ci] & !c.edge);
            }
        }

        threats
    }

    /// Features of the pieces buried in stacks
    fn score_stacks(&self, position: &Position, terms: &mut Terms) {
        let w = &self.weights;
        let c = position.constants();
        let (white, black) = (position.white(), position.black());
        let size = position.size() as u32;

        let white_flats = popcount(white & !(position.standing() | position.caps())) as i64;
        let black_flats = popcount(black & !(position.standing() | position.caps())) as i64;
        terms[Feature::Flat as usize][0] += white_flats * w[Feature::Flat];
        terms[Feature::Flat as usize][1] += black_flats * w[Feature::Flat];

        for i in BitIter::new(white | black) {
            let height = position.height(i as usize);
            if height <= 1 {
                continue;
            }
            let bit = 1u64 << i;
            let buried = position.stack_bits(i as usize);
            let buried_black = popcount(buried) as i64;
            let buried_white = (height - 1) as i64 - buried_black;
            terms[Feature::Flat as usize][0] += buried_white * w[Feature::Flat];
            terms[Feature::Flat as usize][1] += buried_black * w[Feature::Flat];

            // Only the pieces that can be carried off in one move
            let depth = (height as u32 - 1).min(size);
            let reachable = buried & low_bits(depth);
            let (ci, own, opponent, hard) = if white & bit != 0 {
                let soft = popcount(reachable);
                (0, white, black, depth - soft)
            } else {
                (1, black, white, popcount(reachable))
            };
            let soft = depth - hard;
            let mut add = |feature: Feature, count: i64| {
                terms[feature as usize][ci] += count * w[feature];
            };
            add(Feature::Captured, depth as i64);

            let role = if position.caps() & bit != 0 {
                Role::Cap
            } else if position.standing() & bit != 0 {
                Role::Wall
            } else {
                Role::Flat
            };
            if role == Role::Cap {
                let below_is_black = buried & 1 != 0;
                if below_is_black == (ci == 1) {
                    add(Feature::HardTopCap, 1);
                }
                add(
                    Feature::CapMobility,
                    popcount(mobility(c, position, bit, height as u32)) as i64,
                );
            }
            if hard > 0 {
                let throw = mobility(c, position, bit, hard);
                add(Feature::ThrowMine, popcount(throw & own) as i64);
                add(Feature::ThrowTheirs, popcount(throw & opponent) as i64);
                add(
                    Feature::ThrowEmpty,
                    popcount(throw & c.mask & !(white | black)) as i64,
                );
            }
            let (hard_feature, soft_feature) = match role {
                Role::Wall => (Feature::HardStandingCaptive, Feature::SoftStandingCaptive),
                Role::Cap => (Feature::HardCapstoneCaptive, Feature::SoftCapstoneCaptive),
                Role::Flat => (Feature::HardFlatCaptive, Feature::SoftFlatCaptive),
            };
            add(hard_feature, hard as i64);
            add(soft_feature, soft as i64);
        }
    }

    /// Static value from white's perspective, and whether each side has a road in one
    fn white_score(&self, position: &Position) -> (i64, (bool, bool)) {
        let mut terms = [[0; 2]; NUM_FEATURES];
        let threats = self.score_terms(position, &mut terms);
        let score = terms.iter().map(|[white, black]| white - black).sum();
        (score, threats)
    }
}

impl Evaluator for WeightedEvaluator {
    fn evaluate(&self, position: &Position) -> i64 {
        if let Some(result) = position.game_over() {
            return terminal_value(position, result);
        }
        let (mut score, (white_threat, black_threat)) = self.white_score(position);
        match position.to_move() {
            Color::White => {
                if white_threat {
                    score += IMMEDIATE_THREAT;
                }
                score
            }
            Color::Black => {
                if black_threat {
                    score -= IMMEDIATE_THREAT;
                }
                -score
            }
        }
    }

    fn explain(&self, position: &Position, out: &mut dyn io::Write) -> io::Result<()> {
        if let Some(result) = position.game_over() {
            writeln!(out, "game over: {:?}", result)?;
            return writeln!(out, "score\t{}", terminal_value(position, result));
        }
        let mut terms = [[0; 2]; NUM_FEATURES];
        let (white_threat, black_threat) = self.score_terms(position, &mut terms);
        writeln!(out, "{:<20}{:>10}{:>10}", "", "white", "black")?;
        for &feature in Feature::ALL {
            let [white, black] = terms[feature as usize];
            if white != 0 || black != 0 {
                writeln!(out, "{:<20}{:>10}{:>10}", feature.name(), white, black)?;
            }
        }
        let c = position.constants();
        for color in [Color::White, Color::Black] {
            for (n, &group) in position.analysis().groups(color).iter().enumerate() {
                let (width, height) = c.dimensions(group);
                writeln!(out, "{:?} group {}: {}x{}", color, n, width, height)?;
            }
        }
        if white_threat || black_threat {
            writeln!(
                out,
                "road in one: white {}, black {}",
                white_threat, black_threat
            )?;
        }
        writeln!(out, "score\t{}", self.evaluate(position))
    }
}

fn color_index(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 1,
    }
}

/// The four quadrants and the interior of the board
fn concentration_regions(size: u8) -> Vec<u64> {
    let c = Constants::for_size(size);
    let half = size.div_ceil(2);
    let square_block = |x0: u8, y0: u8, width: u8| {
        let mut bits = 0;
        for y in y0..y0 + width {
            for x in x0..x0 + width {
                bits |= c.square_mask(x, y);
            }
        }
        bits
    };
    let far = size - half;
    vec![
        square_block(0, 0, half),
        square_block(far, 0, half),
        square_block(0, far, half),
        square_block(far, far, half),
        square_block(1, 1, size - 2),
    ]
}

/// Squares a stack of `height` pieces at `bit` can reach in a straight line
fn mobility(c: &Constants, position: &Position, bit: u64, height: u32) -> u64 {
    let mut reach = bit;
    let stop = (position.caps() | position.standing() | !c.mask) & !bit;
    let size = c.size as u32;

    let mut e = bit << 1;
    for _ in 0..height {
        if e & (stop | c.left) != 0 || e == 0 {
            break;
        }
        reach |= e;
        e <<= 1;
    }
    let mut e = bit >> 1;
    for _ in 0..height {
        if e & (stop | c.right) != 0 || e == 0 {
            break;
        }
        reach |= e;
        e >>= 1;
    }
    let mut e = bit.checked_shl(size).unwrap_or(0);
    for _ in 0..height {
        if e & stop != 0 || e == 0 {
            break;
        }
        reach |= e;
        e = e.checked_shl(size).unwrap_or(0);
    }
    let mut e = bit >> size;
    for _ in 0..height {
        if e & stop != 0 || e == 0 {
            break;
        }
        reach |= e;
        e >>= size;
    }
    reach
}

/// `(placements, slides)` that would complete a road next move, for white and black
fn count_threats(c: &Constants, position: &Position) -> [(u32, u32); 2] {
    let empty = c.mask & !position.occupied();
    let blockers = position.standing() | position.caps();
    let open = c.mask & !blockers;

    let count_one = |groups: &[u64], pieces: u64| {
        let mut place = 0;
        let mut threat = 0;
        let mut singles = pieces;
        for group in groups {
            singles &= !group;
        }
        for (i, &group) in groups.iter().enumerate() {
            if group & c.edge == 0 {
                continue;
            }
            let slides = c.grow(open, pieces & !group);
            let mut place_map = 0;
            let mut threat_map = 0;
            if group & c.right != 0 {
                place_map |= (group >> 1) & empty & c.left;
                threat_map |= (group >> 1) & slides & c.left;
            }
            if group & c.left != 0 {
                place_map |= (group << 1) & empty & c.right;
                threat_map |= (group << 1) & slides & c.right;
            }
            if group & c.top != 0 {
                place_map |= (group >> c.size) & empty & c.bottom;
                threat_map |= (group >> c.size) & slides & c.bottom;
            }
            if group & c.bottom != 0 {
                place_map |= (group << c.size) & empty & c.top;
                threat_map |= (group << c.size) & slides & c.top;
            }

            let others = groups[..i]
                .iter()
                .copied()
                .chain(BitIter::new(singles).map(|j| 1u64 << j));
            for other in others {
                let spans = (group & c.left != 0 && other & c.right != 0)
                    || (group & c.right != 0 && other & c.left != 0)
                    || (group & c.bottom != 0 && other & c.top != 0)
                    || (group & c.top != 0 && other & c.bottom != 0);
                if !spans {
                    continue;
                }
                let slides = c.grow(open, pieces & !(group | other));
                let between = c.grow(c.mask, group) & c.grow(c.mask, other);
                place_map |= between & empty;
                threat_map |= between & slides;
            }
            place += popcount(place_map);
            threat += popcount(threat_map);
        }
        (place, threat)
    };

    let analysis = position.analysis();
    [
        count_one(&analysis.white_groups, position.white() & !blockers),
        count_one(&analysis.black_groups, position.black() & !blockers),
    ]
}

/// Adds one to a saturating 3-bit counter per square, for each neighbour of each piece
fn compute_influence(c: &Constants, pieces: u64, out: &mut [u64; 3]) {
    for i in BitIter::new(pieces) {
        let bit = 1u64 << i;
        let mut carry = c.grow(c.mask, bit) & !bit;
        for counter in out.iter_mut() {
            if carry == 0 {
                break;
            }
            let overflow = *counter & carry;
            *counter ^= carry;
            carry = overflow;
        }
        if carry != 0 {
            out[2] |= carry;
        }
    }
}

/// Squares controlled by white and black
fn compute_control(c: &Constants, position: &Position) -> [u64; 2] {
    let blockers = position.standing() | position.caps();
    let mut white_influence = [0; 3];
    let mut black_influence = [0; 3];
    compute_influence(c, position.white() & !blockers, &mut white_influence);
    compute_influence(c, position.black() & !blockers, &mut black_influence);

    let (mut white_control, mut black_control) = (0, 0);
    for i in (0..3).rev() {
        let decided = white_control | black_control;
        let white_bits = white_influence[i] & !decided;
        let black_bits = black_influence[i] & !decided;
        white_control |= white_bits & !black_bits;
        black_control |= black_bits & !white_bits;
    }
    let walls = c.grow(c.mask, position.standing());
    let white_caps = c.grow(c.mask, position.caps() & position.white());
    let black_caps = c.grow(c.mask, position.caps() & position.black());
    white_control |= white_caps & !black_caps;
    black_control |= black_caps & !white_caps;
    [white_control & !walls, black_control & !walls]
}
