//! Legality of single-card moves.
//!
//! The checker is a pure predicate over two concrete piles; it never
//! touches a [`GameState`](crate::GameState).

use crate::card::{Face, Pile};
use crate::error::IllegalMove;
use crate::state::PileKind;

/// Decide whether the top card of `from` may move onto `to`.
///
/// Rules, in order:
/// 1. Nothing leaves the stock except by flipping.
/// 2. Nothing lands on the stock or the waste.
/// 3. The source must have a card.
/// 4. An empty tableau takes anything; an empty foundation takes only an ace.
/// 5. Otherwise suits must match, tableaus build down by one, foundations
///    build up by one.
pub fn is_move_legal(
    from_kind: PileKind,
    from: &Pile,
    to_kind: PileKind,
    to: &Pile,
) -> Result<(), IllegalMove> {
    if from_kind == PileKind::Stock {
        return Err(IllegalMove::FromStock);
    }
    if matches!(to_kind, PileKind::Stock | PileKind::Waste) {
        return Err(IllegalMove::ToReservedPile(to_kind));
    }
    let moving = *from.top().ok_or(IllegalMove::NothingToMove)?;

    let Some(&dest) = to.top() else {
        return match to_kind {
            PileKind::Foundation if moving.face != Face::Ace => {
                Err(IllegalMove::FoundationNeedsAce(moving))
            }
            _ => Ok(()),
        };
    };

    if moving.suit != dest.suit {
        return Err(IllegalMove::SuitMismatch { moving, dest });
    }
    match to_kind {
        PileKind::Tableau => {
            if dest.face.decrement() == Ok(moving.face) {
                Ok(())
            } else {
                Err(IllegalMove::NotDescending { moving, dest })
            }
        }
        _ => {
            if dest.face.increment() == Ok(moving.face) {
                Ok(())
            } else {
                Err(IllegalMove::NotAscending { moving, dest })
            }
        }
    }
}

/// A flip is legal iff the stock has a card.
pub fn can_flip_stock(stock: &Pile) -> bool {
    !stock.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, Face, Suit};

    fn pile(cards: &[(Face, Suit)]) -> Pile {
        Pile::from_cards(cards.iter().map(|&(f, s)| Card::new(f, s)).collect())
    }

    #[test]
    fn test_from_stock_is_illegal() {
        let result = is_move_legal(
            PileKind::Stock,
            &pile(&[(Face::Two, Suit::Club)]),
            PileKind::Foundation,
            &pile(&[(Face::Ace, Suit::Club)]),
        );
        assert_eq!(result, Err(IllegalMove::FromStock));
    }

    #[test]
    fn test_to_waste_or_stock_is_illegal() {
        let king = pile(&[(Face::King, Suit::Club)]);
        assert_eq!(
            is_move_legal(PileKind::Tableau, &king, PileKind::Waste, &Pile::new()),
            Err(IllegalMove::ToReservedPile(PileKind::Waste))
        );
        assert_eq!(
            is_move_legal(PileKind::Tableau, &king, PileKind::Stock, &Pile::new()),
            Err(IllegalMove::ToReservedPile(PileKind::Stock))
        );
    }

    #[test]
    fn test_empty_source_is_illegal() {
        assert_eq!(
            is_move_legal(PileKind::Waste, &Pile::new(), PileKind::Tableau, &Pile::new()),
            Err(IllegalMove::NothingToMove)
        );
    }

    #[test]
    fn test_empty_foundation_requires_ace() {
        let ace = pile(&[(Face::Ace, Suit::Club)]);
        let king = pile(&[(Face::King, Suit::Club)]);
        assert!(is_move_legal(PileKind::Tableau, &ace, PileKind::Foundation, &Pile::new()).is_ok());
        assert!(matches!(
            is_move_legal(PileKind::Tableau, &king, PileKind::Foundation, &Pile::new()),
            Err(IllegalMove::FoundationNeedsAce(_))
        ));
    }

    #[test]
    fn test_foundation_builds_up_in_suit() {
        // Ace onto populated foundation
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::Ace, Suit::Club)]),
            PileKind::Foundation,
            &pile(&[(Face::King, Suit::Club)]),
        )
        .is_err());
        // Ten onto jack
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::Ten, Suit::Club)]),
            PileKind::Foundation,
            &pile(&[(Face::Jack, Suit::Club)]),
        )
        .is_err());
        // Two onto ace
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::Two, Suit::Club)]),
            PileKind::Foundation,
            &pile(&[(Face::Ace, Suit::Club)]),
        )
        .is_ok());
        // Three onto ace/two
        assert!(is_move_legal(
            PileKind::Waste,
            &pile(&[(Face::Three, Suit::Club)]),
            PileKind::Foundation,
            &pile(&[(Face::Ace, Suit::Club), (Face::Two, Suit::Club)]),
        )
        .is_ok());
        // Wrong suit
        assert!(matches!(
            is_move_legal(
                PileKind::Tableau,
                &pile(&[(Face::Three, Suit::Heart)]),
                PileKind::Foundation,
                &pile(&[(Face::Ace, Suit::Club), (Face::Two, Suit::Club)]),
            ),
            Err(IllegalMove::SuitMismatch { .. })
        ));
    }

    #[test]
    fn test_tableau_builds_down_in_suit() {
        // Anything onto empty tableau
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::Three, Suit::Club)]),
            PileKind::Tableau,
            &Pile::new(),
        )
        .is_ok());
        // Ten onto jack
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::Ten, Suit::Club)]),
            PileKind::Tableau,
            &pile(&[(Face::Jack, Suit::Club)]),
        )
        .is_ok());
        // Nine onto jack/ten
        assert!(is_move_legal(
            PileKind::Foundation,
            &pile(&[(Face::Nine, Suit::Club)]),
            PileKind::Tableau,
            &pile(&[(Face::Jack, Suit::Club), (Face::Ten, Suit::Club)]),
        )
        .is_ok());
        // Jack onto ten
        assert!(matches!(
            is_move_legal(
                PileKind::Tableau,
                &pile(&[(Face::Jack, Suit::Club)]),
                PileKind::Tableau,
                &pile(&[(Face::Ten, Suit::Club)]),
            ),
            Err(IllegalMove::NotDescending { .. })
        ));
        // Heart onto clubs
        assert!(matches!(
            is_move_legal(
                PileKind::Tableau,
                &pile(&[(Face::Nine, Suit::Heart)]),
                PileKind::Tableau,
                &pile(&[(Face::Jack, Suit::Club), (Face::Ten, Suit::Club)]),
            ),
            Err(IllegalMove::SuitMismatch { .. })
        ));
    }

    #[test]
    fn test_boundary_faces_never_chain() {
        // Nothing sits below an ace on a tableau
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::King, Suit::Spade)]),
            PileKind::Tableau,
            &pile(&[(Face::Ace, Suit::Spade)]),
        )
        .is_err());
        // Nothing goes above a king on a foundation
        assert!(is_move_legal(
            PileKind::Tableau,
            &pile(&[(Face::Ace, Suit::Spade)]),
            PileKind::Foundation,
            &pile(&[(Face::King, Suit::Spade)]),
        )
        .is_err());
    }

    #[test]
    fn test_can_flip_stock() {
        assert!(!can_flip_stock(&Pile::new()));
        assert!(can_flip_stock(&pile(&[(Face::Five, Suit::Diamond)])));
    }
}
