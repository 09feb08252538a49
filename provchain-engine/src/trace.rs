use std::collections::BTreeMap;

use provchain_core::error::LedgerError;
use provchain_core::id::TokenId;

use crate::ledger::TokenLedger;

/// Read-only origin tracing over the ledger's lineage DAG.
///
/// One unit of a manufactured token owes `amount / total_supply` of itself
/// to each parent edge; contributions compose multiplicatively along a path
/// and add across paths when a token reaches the same ancestor through
/// different intermediates. An origin (zero-parent) token contributes its
/// accumulated weight to itself.
pub struct TraceEngine<'a> {
    ledger: &'a TokenLedger,
}

impl<'a> TraceEngine<'a> {
    pub fn new(ledger: &'a TokenLedger) -> Self {
        Self { ledger }
    }

    /// Per-unit origin composition of `token`, sorted by origin token id.
    ///
    /// Creation-time validation does not forbid a token from indirectly
    /// listing itself as an ancestor, so the walk carries the current path
    /// and fails with `CyclicLineage` instead of recursing forever.
    pub fn trace_to_origin(&self, token: TokenId) -> Result<Vec<(TokenId, f64)>, LedgerError> {
        self.ledger.get_token(token)?;

        let mut origins: BTreeMap<TokenId, f64> = BTreeMap::new();
        let mut path: Vec<TokenId> = Vec::new();
        self.visit(token, 1.0, &mut path, &mut origins)?;
        Ok(origins.into_iter().collect())
    }

    fn visit(
        &self,
        token: TokenId,
        weight: f64,
        path: &mut Vec<TokenId>,
        origins: &mut BTreeMap<TokenId, f64>,
    ) -> Result<(), LedgerError> {
        if path.contains(&token) {
            return Err(LedgerError::CyclicLineage(token));
        }

        let record = self.ledger.get_token(token)?;
        if record.is_origin() {
            *origins.entry(token).or_insert(0.0) += weight;
            return Ok(());
        }

        path.push(token);
        let per_unit = 1.0 / record.total_supply as f64;
        for edge in &record.parents {
            self.visit(edge.parent, weight * edge.amount as f64 * per_unit, path, origins)?;
        }
        path.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provchain_core::id::PartyAddress;
    use provchain_core::party::{PartyRecord, PartyStatus, Role};
    use provchain_core::token::{LineageEdge, TokenRecord};

    use crate::escrow::TransferEscrow;

    fn party(seed: &[u8], role: Role) -> PartyRecord {
        PartyRecord {
            id: 1,
            address: PartyAddress::derive(&[seed]),
            role,
            status: PartyStatus::Approved,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Producer holding two raw tokens and a factory holding stock of both.
    fn stocked_ledger() -> (TokenLedger, PartyRecord, PartyRecord) {
        let mut ledger = TokenLedger::new();
        let escrow = TransferEscrow::new();
        let producer = party(b"producer", Role::Producer);
        let factory = party(b"factory", Role::Factory);

        let cotton = ledger
            .create_token(&producer, "Cotton", 1000, "{}", vec![], &escrow)
            .unwrap();
        let dye = ledger
            .create_token(&producer, "Dye", 200, "{}", vec![], &escrow)
            .unwrap();
        ledger
            .settle_transfer(producer.address, factory.address, cotton, 1000)
            .unwrap();
        ledger
            .settle_transfer(producer.address, factory.address, dye, 200)
            .unwrap();
        (ledger, producer, factory)
    }

    #[test]
    fn test_origin_token_traces_to_itself() {
        let (ledger, _, _) = stocked_ledger();
        let trace = TraceEngine::new(&ledger).trace_to_origin(1).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].0, 1);
        assert!(approx(trace[0].1, 1.0));
    }

    #[test]
    fn test_unknown_token() {
        let ledger = TokenLedger::new();
        assert!(matches!(
            TraceEngine::new(&ledger).trace_to_origin(5),
            Err(LedgerError::TokenNotFound(5))
        ));
    }

    #[test]
    fn test_single_edge_proportion() {
        let (mut ledger, _, factory) = stocked_ledger();
        let escrow = TransferEscrow::new();

        // Yarn: supply 500, consuming 300 cotton
        let yarn = ledger
            .create_token(
                &factory,
                "Yarn",
                500,
                "{}",
                vec![LineageEdge::new(1, 300)],
                &escrow,
            )
            .unwrap();

        let trace = TraceEngine::new(&ledger).trace_to_origin(yarn).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].0, 1);
        assert!(approx(trace[0].1, 300.0 / 500.0));
    }

    #[test]
    fn test_multi_parent_composition() {
        let (mut ledger, _, factory) = stocked_ledger();
        let escrow = TransferEscrow::new();

        // Fabric: supply 100, consuming 400 cotton and 50 dye
        let fabric = ledger
            .create_token(
                &factory,
                "Fabric",
                100,
                "{}",
                vec![LineageEdge::new(1, 400), LineageEdge::new(2, 50)],
                &escrow,
            )
            .unwrap();

        let trace = TraceEngine::new(&ledger).trace_to_origin(fabric).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].0, 1);
        assert!(approx(trace[0].1, 4.0));
        assert_eq!(trace[1].0, 2);
        assert!(approx(trace[1].1, 0.5));
    }

    #[test]
    fn test_contributions_compose_along_chains() {
        let (mut ledger, _, factory) = stocked_ledger();
        let escrow = TransferEscrow::new();

        // Yarn: 500 units from 300 cotton; garment: 50 units from 200 yarn.
        // Per garment unit: (200 / 50) * (300 / 500) cotton.
        let yarn = ledger
            .create_token(
                &factory,
                "Yarn",
                500,
                "{}",
                vec![LineageEdge::new(1, 300)],
                &escrow,
            )
            .unwrap();
        let garment = ledger
            .create_token(
                &factory,
                "Garment",
                50,
                "{}",
                vec![LineageEdge::new(yarn, 200)],
                &escrow,
            )
            .unwrap();

        let trace = TraceEngine::new(&ledger).trace_to_origin(garment).unwrap();
        assert_eq!(trace.len(), 1);
        assert!(approx(trace[0].1, (200.0 / 50.0) * (300.0 / 500.0)));
    }

    #[test]
    fn test_diamond_paths_add() {
        let (mut ledger, _, factory) = stocked_ledger();
        let escrow = TransferEscrow::new();

        // Two intermediates both made of cotton, recombined downstream.
        let yarn = ledger
            .create_token(
                &factory,
                "Yarn",
                100,
                "{}",
                vec![LineageEdge::new(1, 200)],
                &escrow,
            )
            .unwrap();
        let padding = ledger
            .create_token(
                &factory,
                "Padding",
                100,
                "{}",
                vec![LineageEdge::new(1, 400)],
                &escrow,
            )
            .unwrap();
        let jacket = ledger
            .create_token(
                &factory,
                "Jacket",
                10,
                "{}",
                vec![LineageEdge::new(yarn, 50), LineageEdge::new(padding, 20)],
                &escrow,
            )
            .unwrap();

        let trace = TraceEngine::new(&ledger).trace_to_origin(jacket).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].0, 1);
        // (50/10)*(200/100) + (20/10)*(400/100)
        assert!(approx(trace[0].1, 5.0 * 2.0 + 2.0 * 4.0));
    }

    #[test]
    fn test_cycle_is_detected() {
        // Cycles cannot be built through the public API (a parent must
        // already exist), so forge the records directly.
        let mut ledger = TokenLedger::new();
        let creator = PartyAddress::derive(&[b"forger"]);
        for (id, parent) in [(1u64, 2u64), (2, 1)] {
            ledger.tokens.insert(
                id,
                TokenRecord {
                    id,
                    creator,
                    name: format!("loop-{}", id),
                    total_supply: 10,
                    features: String::new(),
                    parents: vec![LineageEdge::new(parent, 5)],
                    created_at: 0,
                },
            );
        }
        ledger.next_id = 3;

        assert!(matches!(
            TraceEngine::new(&ledger).trace_to_origin(1),
            Err(LedgerError::CyclicLineage(_))
        ));
    }

    #[test]
    fn test_self_cycle_is_detected() {
        let mut ledger = TokenLedger::new();
        ledger.tokens.insert(
            1,
            TokenRecord {
                id: 1,
                creator: PartyAddress::derive(&[b"forger"]),
                name: "ouroboros".to_string(),
                total_supply: 10,
                features: String::new(),
                parents: vec![LineageEdge::new(1, 1)],
                created_at: 0,
            },
        );
        ledger.next_id = 2;

        assert!(matches!(
            TraceEngine::new(&ledger).trace_to_origin(1),
            Err(LedgerError::CyclicLineage(1))
        ));
    }
}
