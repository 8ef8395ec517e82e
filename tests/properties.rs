use std::sync::Arc;

use alloy_primitives::{Address, U256};
use proptest::prelude::*;

use power_bonding_curve::solver::{search_ceiling, search_iteration_bound};
use power_bonding_curve::{
    solve_buy, CurveEngine, CurveError, CurveParams, EngineConfig, EventRecorder, MemoryToken,
    PricedAsset, Token, DEFAULT_SEARCH_CEILING_TOKENS, MIN_COEFFICIENT, SCALE,
};

const OWNER: Address = Address::repeat_byte(0x0a);
const CUSTODY: Address = Address::repeat_byte(0xcc);
const RESERVE: Address = Address::repeat_byte(0xee);
const ASSET: Address = Address::repeat_byte(0x10);
const TRADER: Address = Address::repeat_byte(0xa1);

fn fixed(n: u64) -> U256 {
    U256::from(n) * SCALE
}

// Coefficients from 1e-9 to about 1e6 reserve per token, exponents 1 to 4
prop_compose! {
    fn curve_params()
        (
            coefficient_scale in 0u32..=12,
            coefficient_digits in 1u64..1_000,
            degree in 1u64..=4,
        ) -> CurveParams {
        let coefficient = MIN_COEFFICIENT
            * U256::from(coefficient_digits)
            * U256::from(10u64.pow(coefficient_scale));
        CurveParams::new(coefficient, fixed(degree)).unwrap()
    }
}

// Reserve amounts from one wei to one million tokens
prop_compose! {
    fn reserve_amount()
        (wei in 1u64..=u64::MAX, tokens in 0u64..1_000_000) -> U256 {
        U256::from(wei) + fixed(tokens)
    }
}

#[derive(Debug, Clone, Copy)]
enum Trade {
    Buy(u64),
    /// Fraction of the trader's holdings to sell, in per mille
    Sell(u16),
}

fn trade() -> impl Strategy<Value = Trade> {
    prop_oneof![
        (1u64..10_000).prop_map(Trade::Buy),
        (1u16..=1_000).prop_map(Trade::Sell),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: buying then immediately selling the minted amount never
    /// returns more reserve than was paid
    #[test]
    fn round_trip_is_not_profitable(
        params in curve_params(),
        supply_tokens in 0u64..10_000,
        reserve in reserve_amount(),
    ) {
        let supply = fixed(supply_tokens);
        let ceiling = search_ceiling(DEFAULT_SEARCH_CEILING_TOKENS);

        match solve_buy(&params, supply, reserve, ceiling) {
            Ok(solution) => {
                let back = params
                    .sell_return(supply + solution.supply_delta, solution.supply_delta)
                    .unwrap();
                prop_assert!(back <= reserve, "paid {} got back {}", reserve, back);
            }
            Err(CurveError::SearchCeilingExceeded { .. }) => {}
            Err(err) => prop_assert!(false, "unexpected error {}", err),
        }
    }

    /// Property: the solver result is the largest supply the payment covers
    /// and is reached within the documented number of evaluations
    #[test]
    fn solver_is_tight_and_bounded(
        params in curve_params(),
        supply_tokens in 0u64..10_000,
        reserve in reserve_amount(),
    ) {
        let supply = fixed(supply_tokens);
        let ceiling = search_ceiling(DEFAULT_SEARCH_CEILING_TOKENS);
        let target = params.normalized_integral(supply).unwrap()
            + params.normalize_reserve(reserve).unwrap();

        if let Ok(solution) = solve_buy(&params, supply, reserve, ceiling) {
            let minted = supply + solution.supply_delta;
            prop_assert!(solution.iterations <= search_iteration_bound(ceiling));
            prop_assert!(params.normalized_integral(minted).unwrap() <= target);
            if let Ok(next) = params.normalized_integral(minted + U256::from(1u64)) {
                prop_assert!(next > target);
            }
        }
    }

    /// Property: marginal price rises with supply for k > 1 and is flat for k = 1
    #[test]
    fn price_is_monotonic_in_supply(
        params in curve_params(),
        lower in 0u64..1_000_000,
        step in 1u64..1_000_000,
    ) {
        let at_lower = params.marginal_price(fixed(lower)).unwrap();
        let at_upper = params.marginal_price(fixed(lower + step)).unwrap();

        if params.exponent() == SCALE {
            prop_assert_eq!(at_lower, at_upper);
        } else {
            prop_assert!(at_upper > at_lower, "{} then {}", at_lower, at_upper);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: after any trade sequence the reserve ledger covers the curve
    /// integral, and exceeds it only by what rounding left over
    #[test]
    fn reserve_tracks_integral(
        params in curve_params(),
        trades in prop::collection::vec(trade(), 1..40),
    ) {
        let reserve = Arc::new(MemoryToken::new(RESERVE, CUSTODY));
        let asset = Arc::new(MemoryToken::new(ASSET, CUSTODY));
        let engine = CurveEngine::new(
            EngineConfig::new(OWNER, CUSTODY),
            reserve.clone(),
            Arc::new(EventRecorder::new()),
        )
        .unwrap();
        engine
            .initialize_curve(OWNER, asset.clone(), params.coefficient(), params.exponent())
            .unwrap();
        reserve.fund(TRADER, fixed(1_000_000_000)).unwrap();

        // reserve worth of one unit of the normalized integral, rounded up
        let unit = params.coefficient() / SCALE + U256::from(1u64);
        let mut allowance = U256::ZERO;
        for trade in trades {
            let outcome = match trade {
                Trade::Buy(tokens) => engine.buy(TRADER, ASSET, fixed(tokens), U256::ZERO),
                Trade::Sell(per_mille) => {
                    let held = asset.balance_of(TRADER);
                    let amount = held * U256::from(per_mille) / U256::from(1_000u64);
                    engine.sell(TRADER, ASSET, amount, U256::ZERO)
                }
            };
            let supply = asset.total_supply();
            match (trade, outcome) {
                // a buy may leave at most the price of one more unit unminted
                (Trade::Buy(_), Ok(_)) => {
                    allowance += params.buy_cost(supply, U256::from(1u64)).unwrap() + unit + U256::from(1u64);
                }
                (Trade::Sell(_), Ok(_)) => allowance += U256::from(1u64),
                (_, Err(CurveError::ZeroAmount | CurveError::ZeroOutput)) => {}
                (_, Err(err)) => prop_assert!(false, "unexpected error {}", err),
            }

            let balance = engine.reserve_balance(ASSET).unwrap();
            let backing = params.reserve_integral(supply).unwrap();
            prop_assert!(balance >= backing, "ledger {} below integral {}", balance, backing);
            prop_assert!(
                balance - backing <= allowance,
                "ledger {} exceeds integral {} by more than {}",
                balance,
                backing,
                allowance
            );
            prop_assert_eq!(reserve.balance_of(CUSTODY), balance);
        }
    }
}
