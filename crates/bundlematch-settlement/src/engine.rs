//! Settlement engine: atomic execution of signed maker/taker pairs.
//!
//! For each `(sell, buy)` pair of a `take_orders` batch:
//! 1. Assign roles: the caller's order is the taker, the other the maker
//! 2. Structural validation, signatures, nonces
//! 3. Exec params, currency allow-list, complication lookup
//! 4. Complication: time windows, price, bundle
//! 5. Curator fee and slippage floors
//! 6. Pre-flight collaborator checks (ownership, approvals, funds)
//! 7. Consume both nonces, then move currency and assets (journaled)
//! 8. Re-check conservation; any failure rolls the pair back
//!
//! Nonce state is always written before collaborators are called, so a
//! re-entrant collaborator can never see the pair's orders as still open.

use bundlematch_ingress::{OrderValidator, SignatureVerifier, SigningDomain};
use bundlematch_matchcore::{Complication, Execution, curator_fee, within_slippage_bound};
use bundlematch_types::{
    Address, Amount, BundlematchError, ExchangeConfig, FillId, MatchResult, Order, OrderSide,
    ResolvedBundle, Result, SkippedPair, TakeOutcome, constants,
};
use chrono::{DateTime, Utc};

use crate::assets::{AssetLedger, InMemoryAssets};
use crate::currency::{CurrencyLedger, InMemoryCurrency};
use crate::fees::{FeePolicy, StaticFeePolicy};
use crate::journal::{Effect, Journal};
use crate::nonce_ledger::NonceLedger;
use crate::registry::{ComplicationRegistry, CurrencyAllowlist, CurrencyRegistry};
use crate::supply_conservation::SupplyConservation;

/// Everything a pair will move once it is cleared for settlement.
#[derive(Debug, Clone)]
pub(crate) struct SettlementPlan {
    pub(crate) buyer: Address,
    pub(crate) seller: Address,
    pub(crate) currency: Address,
    /// The exchange: spender of currency, operator of assets.
    pub(crate) operator: Address,
    pub(crate) treasury: Address,
    pub(crate) price: Amount,
    pub(crate) fee: Amount,
    pub(crate) bundle: ResolvedBundle,
}

impl SettlementPlan {
    pub(crate) fn seller_proceeds(&self) -> Amount {
        self.price - self.fee
    }
}

/// Engine over in-memory collaborators.
pub type InMemoryEngine =
    SettlementEngine<InMemoryCurrency, InMemoryAssets, StaticFeePolicy, CurrencyRegistry>;

/// The exchange: owns nonce state, talks to collaborators, settles pairs.
pub struct SettlementEngine<C, A, F, L> {
    config: ExchangeConfig,
    nonces: NonceLedger,
    verifier: SignatureVerifier,
    validator: OrderValidator,
    complications: ComplicationRegistry,
    currencies: L,
    fees: F,
    currency: C,
    assets: A,
}

impl InMemoryEngine {
    /// Engine with empty in-memory ledgers, fees from `config.fees`, no
    /// allowed currencies and no registered complications.
    ///
    /// # Errors
    /// [`BundlematchError::Configuration`] if `config` is invalid.
    pub fn in_memory(config: ExchangeConfig) -> Result<Self> {
        let fees = StaticFeePolicy::from_config(&config.fees);
        Self::new(
            config,
            InMemoryCurrency::new(),
            InMemoryAssets::new(),
            fees,
            CurrencyRegistry::new(),
        )
    }
}

impl<C, A, F, L> SettlementEngine<C, A, F, L>
where
    C: CurrencyLedger,
    A: AssetLedger,
    F: FeePolicy,
    L: CurrencyAllowlist,
{
    /// # Errors
    /// [`BundlematchError::Configuration`] if `config` is invalid.
    pub fn new(config: ExchangeConfig, currency: C, assets: A, fees: F, currencies: L) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            protocol = constants::PROTOCOL_NAME,
            version = constants::VERSION,
            chain_id = config.chain_id,
            exchange = %config.exchange,
            fee_bps = fees.fee_bps(),
            "Settlement engine initialised"
        );
        Ok(Self {
            nonces: NonceLedger::from_config(&config),
            verifier: SignatureVerifier::new(SigningDomain::from_config(&config)),
            validator: OrderValidator::new(),
            complications: ComplicationRegistry::new(),
            config,
            currencies,
            fees,
            currency,
            assets,
        })
    }

    /// Replace the structural validator (custom size limits).
    #[must_use]
    pub fn with_validator(mut self, validator: OrderValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn register_complication(&mut self, address: Address, complication: Box<dyn Complication>) {
        self.complications.register(address, complication);
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    #[must_use]
    pub fn nonce_ledger(&self) -> &NonceLedger {
        &self.nonces
    }

    #[must_use]
    pub fn complications(&self) -> &ComplicationRegistry {
        &self.complications
    }

    #[must_use]
    pub fn currencies(&self) -> &L {
        &self.currencies
    }

    pub fn currencies_mut(&mut self) -> &mut L {
        &mut self.currencies
    }

    #[must_use]
    pub fn fee_policy(&self) -> &F {
        &self.fees
    }

    #[must_use]
    pub fn currency_ledger(&self) -> &C {
        &self.currency
    }

    pub fn currency_ledger_mut(&mut self) -> &mut C {
        &mut self.currency
    }

    #[must_use]
    pub fn asset_ledger(&self) -> &A {
        &self.assets
    }

    pub fn asset_ledger_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    // -----------------------------------------------------------------------
    // Nonce management
    // -----------------------------------------------------------------------

    /// Cancel specific orders of `caller`.
    ///
    /// # Errors
    /// See [`NonceLedger::cancel_multiple_orders`].
    pub fn cancel_multiple_orders(&mut self, caller: &Address, nonces: &[u64]) -> Result<()> {
        self.nonces.cancel_multiple_orders(caller, nonces)
    }

    /// Cancel every order of `caller` below `new_min_nonce`.
    ///
    /// # Errors
    /// See [`NonceLedger::cancel_all_orders`].
    pub fn cancel_all_orders(&mut self, caller: &Address, new_min_nonce: u64) -> Result<()> {
        self.nonces.cancel_all_orders(caller, new_min_nonce)
    }

    #[must_use]
    pub fn is_nonce_valid(&self, signer: &Address, nonce: u64) -> bool {
        self.nonces.is_nonce_valid(signer, nonce)
    }

    #[must_use]
    pub fn user_min_order_nonce(&self, signer: &Address) -> u64 {
        self.nonces.user_min_order_nonce(signer)
    }

    #[must_use]
    pub fn verify_order_sig(&self, order: &Order) -> bool {
        self.verifier.verify(order)
    }

    // -----------------------------------------------------------------------
    // Settlement
    // -----------------------------------------------------------------------

    /// [`take_orders_at`](Self::take_orders_at) at the current wall-clock time.
    ///
    /// # Errors
    /// See [`take_orders_at`](Self::take_orders_at).
    pub fn take_orders(
        &mut self,
        caller: &Address,
        sell_orders: &[Order],
        buy_orders: &[Order],
        strict: bool,
    ) -> Result<TakeOutcome> {
        let now = Utc::now().timestamp();
        self.take_orders_at(caller, sell_orders, buy_orders, strict, now)
    }

    /// Settle `sell_orders[i]` against `buy_orders[i]` for every `i`, with
    /// `caller` as the taker of every pair.
    ///
    /// In strict mode the first failing pair rolls back the whole batch and
    /// its error is returned. Otherwise failing pairs are skipped and listed
    /// in [`TakeOutcome::skipped`].
    ///
    /// # Errors
    /// - [`BundlematchError::MalformedBatch`] if the sequences differ in length
    /// - any pair error in strict mode
    pub fn take_orders_at(
        &mut self,
        caller: &Address,
        sell_orders: &[Order],
        buy_orders: &[Order],
        strict: bool,
        now: i64,
    ) -> Result<TakeOutcome> {
        if sell_orders.len() != buy_orders.len() {
            return Err(BundlematchError::MalformedBatch {
                sells: sell_orders.len(),
                buys: buy_orders.len(),
            });
        }

        let mut outcome = TakeOutcome::default();
        let mut batch = Journal::new();
        for (index, (sell, buy)) in sell_orders.iter().zip(buy_orders).enumerate() {
            match self.settle_pair(caller, sell, buy, now) {
                Ok((fill, journal)) => {
                    batch.append(journal);
                    outcome.fills.push(fill);
                }
                Err(error) if strict => {
                    tracing::warn!(
                        index,
                        sell = %sell.id,
                        buy = %buy.id,
                        error = %error,
                        settled = outcome.fills.len(),
                        "Strict batch aborted, rolling back"
                    );
                    return Err(self.unwind(batch, error));
                }
                Err(error) => {
                    tracing::warn!(
                        index,
                        sell = %sell.id,
                        buy = %buy.id,
                        error = %error,
                        "Pair skipped"
                    );
                    outcome.skipped.push(SkippedPair { index, error });
                }
            }
        }
        Ok(outcome)
    }

    fn settle_pair(
        &mut self,
        caller: &Address,
        sell: &Order,
        buy: &Order,
        now: i64,
    ) -> Result<(MatchResult, Journal)> {
        self.check_orders(sell, buy)?;
        let (maker, taker) = assign_roles(caller, sell, buy)?;
        self.verifier.check(maker)?;
        self.verifier.check(taker)?;
        self.nonces.check_nonce(&maker.signer, maker.nonce)?;
        self.nonces.check_nonce(&taker.signer, taker.nonce)?;

        let execution = self.execute(maker, taker, now)?;
        let plan = self.plan(sell, buy, execution)?;
        self.preflight(&plan)?;

        let conservation = SupplyConservation::snapshot(&plan, &self.currency, &self.assets)?;
        let mut journal = Journal::new();
        if let Err(error) = self.apply(maker, taker, &plan, &mut journal) {
            tracing::warn!(
                maker = %maker.id,
                taker = %taker.id,
                error = %error,
                effects = journal.len(),
                "Settlement failed, rolling back pair"
            );
            return Err(self.unwind(journal, error));
        }
        let verified = conservation
            .verify(&self.currency, &self.assets)
            .and_then(|()| self.verify_consumed(maker, taker));
        if let Err(error) = verified {
            tracing::error!(maker = %maker.id, taker = %taker.id, error = %error, "Post-settlement check failed");
            return Err(self.unwind(journal, error));
        }

        let fill = MatchResult {
            id: FillId::deterministic(&maker.id, &taker.id),
            maker_order_id: maker.id,
            taker_order_id: taker.id,
            maker_side: maker.side,
            buyer: plan.buyer,
            seller: plan.seller,
            currency: plan.currency,
            seller_proceeds: plan.seller_proceeds(),
            price: plan.price,
            fee: plan.fee,
            treasury: plan.treasury,
            bundle: plan.bundle,
            executed_at: DateTime::<Utc>::from_timestamp(now, 0).unwrap_or_default(),
        };
        tracing::info!(
            fill = %fill.id,
            maker = %maker.id,
            taker = %taker.id,
            buyer = %fill.buyer.short(),
            seller = %fill.seller.short(),
            price = %fill.price,
            fee = %fill.fee,
            units = fill.bundle.total_units,
            "Pair settled"
        );
        Ok((fill, journal))
    }

    /// Roll `journal` back after `error`. A rollback that cannot restore
    /// every effect replaces `error`, since the ledgers are now inconsistent.
    fn unwind(&mut self, journal: Journal, error: BundlematchError) -> BundlematchError {
        match journal.rollback(&mut self.nonces, &mut self.currency, &mut self.assets) {
            Ok(()) => error,
            Err(incomplete) => {
                tracing::error!(cause = %error, error = %incomplete, "Rollback incomplete");
                incomplete
            }
        }
    }

    /// Sides and structure of both orders.
    fn check_orders(&self, sell: &Order, buy: &Order) -> Result<()> {
        if sell.side != OrderSide::Sell || buy.side != OrderSide::Buy {
            return Err(BundlematchError::InvalidOrder {
                reason: format!(
                    "pair sides are {}/{}, expected {}/{}",
                    sell.side,
                    buy.side,
                    OrderSide::Sell,
                    OrderSide::Buy
                ),
            });
        }
        self.validator.validate(sell)?;
        self.validator.validate(buy)
    }

    /// Exec params, allow-lists and the complication's verdict.
    fn execute(&self, maker: &Order, taker: &Order, now: i64) -> Result<Execution> {
        if maker.exec_params != taker.exec_params {
            return Err(BundlematchError::ExecParamsMismatch);
        }
        let currency = maker.exec_params.currency;
        if !self.currencies.is_allowed(&currency) {
            return Err(BundlematchError::CurrencyNotAllowed(currency));
        }
        let address = maker.exec_params.complication;
        let complication = self
            .complications
            .get(&address)
            .ok_or(BundlematchError::ComplicationNotAllowed(address))?;
        let execution = complication.can_execute(maker, taker, now)?;
        tracing::debug!(
            complication = complication.name(),
            maker = %maker.id,
            price = %execution.price,
            units = execution.bundle.total_units,
            "Complication accepted pair"
        );
        Ok(execution)
    }

    /// Fee and slippage floors of both orders.
    fn plan(&self, sell: &Order, buy: &Order, execution: Execution) -> Result<SettlementPlan> {
        let price = execution.price;
        let fee = curator_fee(price, self.fees.fee_bps())?;
        for order in [sell, buy] {
            if !within_slippage_bound(order, price, fee) {
                return Err(BundlematchError::SlippageViolation {
                    price,
                    fee,
                    min_bps: order.min_bps_to_seller,
                });
            }
        }
        Ok(SettlementPlan {
            buyer: buy.signer,
            seller: sell.signer,
            currency: sell.exec_params.currency,
            operator: self.config.exchange,
            treasury: self.fees.treasury(),
            price,
            fee,
            bundle: execution.bundle,
        })
    }

    /// Collaborator state must already allow every transfer of `plan`.
    fn preflight(&self, plan: &SettlementPlan) -> Result<()> {
        for item in &plan.bundle.items {
            if !self
                .assets
                .is_approved_for_all(&item.collection, &plan.seller, &plan.operator)
            {
                return Err(BundlematchError::NotApproved {
                    collection: item.collection,
                    owner: plan.seller,
                });
            }
            for token in &item.tokens {
                if self.assets.balance_of(&item.collection, token.token_id, &plan.seller) < token.num_tokens {
                    return Err(BundlematchError::NotOwner {
                        collection: item.collection,
                        token_id: token.token_id,
                        owner: plan.seller,
                        quantity: token.num_tokens,
                    });
                }
            }
        }

        let available = self.currency.balance_of(&plan.currency, &plan.buyer);
        if available < plan.price {
            return Err(BundlematchError::InsufficientBalance {
                needed: plan.price,
                available,
            });
        }
        let allowed = self
            .currency
            .allowance(&plan.currency, &plan.buyer, &plan.operator);
        if allowed < plan.price {
            return Err(BundlematchError::InsufficientAllowance {
                needed: plan.price,
                allowed,
            });
        }
        Ok(())
    }

    /// Consume nonces, then move funds and assets, journaling each step.
    fn apply(
        &mut self,
        maker: &Order,
        taker: &Order,
        plan: &SettlementPlan,
        journal: &mut Journal,
    ) -> Result<()> {
        for order in [maker, taker] {
            self.nonces.mark_executed(&order.signer, order.nonce)?;
            journal.record(Effect::NonceConsumed {
                signer: order.signer,
                nonce: order.nonce,
            });
        }

        for (to, amount) in [(plan.treasury, plan.fee), (plan.seller, plan.seller_proceeds())] {
            if amount.is_zero() {
                continue;
            }
            self.currency
                .transfer_from(&plan.currency, &plan.operator, &plan.buyer, &to, amount)
                .map_err(transfer_failed)?;
            journal.record(Effect::Currency {
                currency: plan.currency,
                spender: plan.operator,
                from: plan.buyer,
                to,
                amount,
            });
        }

        for item in &plan.bundle.items {
            for token in &item.tokens {
                self.assets
                    .transfer_asset(
                        &item.collection,
                        token.token_id,
                        &plan.seller,
                        &plan.buyer,
                        token.num_tokens,
                        &plan.operator,
                    )
                    .map_err(transfer_failed)?;
                journal.record(Effect::Asset {
                    collection: item.collection,
                    token_id: token.token_id,
                    from: plan.seller,
                    to: plan.buyer,
                    quantity: token.num_tokens,
                });
            }
        }
        Ok(())
    }

    fn verify_consumed(&self, maker: &Order, taker: &Order) -> Result<()> {
        for order in [maker, taker] {
            if self.nonces.is_nonce_valid(&order.signer, order.nonce) {
                return Err(BundlematchError::SupplyInvariantViolation {
                    reason: format!("nonce {} of {} still open after settlement", order.nonce, order.id),
                });
            }
        }
        Ok(())
    }
}

impl<C, A, F, L> std::fmt::Debug for SettlementEngine<C, A, F, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("chain_id", &self.config.chain_id)
            .field("exchange", &self.config.exchange)
            .field("complications", &self.complications)
            .finish_non_exhaustive()
    }
}

/// `(maker, taker)` of a pair: the taker is the order signed by `caller`.
fn assign_roles<'a>(caller: &Address, sell: &'a Order, buy: &'a Order) -> Result<(&'a Order, &'a Order)> {
    if sell.signer == buy.signer {
        return Err(BundlematchError::SelfTradeBlocked(sell.signer));
    }
    if buy.signer == *caller {
        Ok((sell, buy))
    } else if sell.signer == *caller {
        Ok((buy, sell))
    } else {
        Err(BundlematchError::InvalidTaker(*caller))
    }
}

fn transfer_failed(error: BundlematchError) -> BundlematchError {
    match error {
        BundlematchError::TransferFailed { .. } => error,
        other => BundlematchError::TransferFailed {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use bundlematch_ingress::OrderSigner;
    use bundlematch_matchcore::OrderBookComplication;
    use bundlematch_types::{OrderItem, TokenInfo};
    use rust_decimal::Decimal;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn exchange() -> Address {
        Address::repeat(0xe0)
    }

    fn weth() -> Address {
        Address::repeat(0xee)
    }

    fn punks() -> Address {
        Address::repeat(0xc1)
    }

    struct Setup {
        engine: InMemoryEngine,
        seller: OrderSigner,
        buyer: OrderSigner,
    }

    fn setup() -> Setup {
        let mut config = ExchangeConfig::new(1, exchange());
        config.fees.treasury = Address::repeat(0x77);
        let mut engine = InMemoryEngine::in_memory(config.clone()).unwrap();
        engine.register_complication(Address::repeat(0xcc), Box::new(OrderBookComplication::from_config(&config)));
        engine.currencies_mut().add(weth());

        let domain = SigningDomain::from_config(&config);
        let seller = OrderSigner::from_seed([1u8; 32], domain);
        let buyer = OrderSigner::from_seed([2u8; 32], domain);

        engine.asset_ledger_mut().mint(&punks(), 0, &seller.address(), 1);
        engine
            .asset_ledger_mut()
            .set_approval_for_all(&punks(), &seller.address(), &exchange(), true);
        engine
            .currency_ledger_mut()
            .deposit(&weth(), &buyer.address(), Decimal::new(100_000, 0));
        engine
            .currency_ledger_mut()
            .approve(&weth(), &buyer.address(), &exchange(), Decimal::new(100_000, 0));
        Setup { engine, seller, buyer }
    }

    fn orders(s: &Setup, price: i64) -> (Order, Order) {
        let sell = s.seller.signed(Order::dummy_with(
            OrderSide::Sell,
            Address::ZERO,
            1,
            vec![OrderItem::new(punks(), vec![TokenInfo::new(0, 1)])],
            1,
            Decimal::new(price, 0),
            NOW,
        ));
        let buy = s.buyer.signed(Order::dummy_with(
            OrderSide::Buy,
            Address::ZERO,
            1,
            sell.nfts.clone(),
            1,
            Decimal::new(price, 0),
            NOW,
        ));
        (sell, buy)
    }

    #[test]
    fn settles_listing_for_buying_taker() {
        let mut s = setup();
        let (sell, buy) = orders(&s, 10_000);
        let outcome = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell.clone()], &[buy.clone()], true, NOW + 1)
            .unwrap();

        assert!(outcome.all_settled());
        let fill = &outcome.fills[0];
        assert_eq!(fill.maker_side, OrderSide::Sell);
        assert_eq!(fill.maker(), s.seller.address());
        assert_eq!(fill.fee, Decimal::new(150, 0));
        assert_eq!(fill.seller_proceeds, Decimal::new(9_850, 0));

        let currency = s.engine.currency_ledger();
        assert_eq!(currency.balance_of(&weth(), &s.seller.address()), Decimal::new(9_850, 0));
        assert_eq!(currency.balance_of(&weth(), &Address::repeat(0x77)), Decimal::new(150, 0));
        assert_eq!(currency.balance_of(&weth(), &s.buyer.address()), Decimal::new(90_000, 0));
        assert_eq!(s.engine.asset_ledger().balance_of(&punks(), 0, &s.buyer.address()), 1);
        assert!(!s.engine.is_nonce_valid(&sell.signer, sell.nonce));
        assert!(!s.engine.is_nonce_valid(&buy.signer, buy.nonce));
    }

    #[test]
    fn caller_must_sign_one_side() {
        let mut s = setup();
        let (sell, buy) = orders(&s, 10_000);
        let err = s
            .engine
            .take_orders_at(&Address::repeat(0x99), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::InvalidTaker(_)));
    }

    #[test]
    fn same_signer_on_both_sides_is_blocked() {
        let mut s = setup();
        let (sell, _) = orders(&s, 10_000);
        let buy = s.seller.signed(Order::dummy_with(
            OrderSide::Buy,
            Address::ZERO,
            2,
            sell.nfts.clone(),
            1,
            Decimal::new(10_000, 0),
            NOW,
        ));
        let err = s
            .engine
            .take_orders_at(&s.seller.address(), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::SelfTradeBlocked(_)));
    }

    #[test]
    fn unequal_batch_is_malformed() {
        let mut s = setup();
        let (sell, _) = orders(&s, 10_000);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell], &[], false, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::MalformedBatch { sells: 1, buys: 0 }));
    }

    #[test]
    fn unknown_currency_and_complication_are_rejected() {
        let mut s = setup();
        s.engine.currencies_mut().remove(&weth());
        let (sell, buy) = orders(&s, 10_000);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::CurrencyNotAllowed(_)));

        let mut s = setup();
        let (mut sell, mut buy) = orders(&s, 10_000);
        sell.exec_params.complication = Address::repeat(0xcd);
        buy.exec_params.complication = Address::repeat(0xcd);
        let sell = s.seller.signed(sell);
        let buy = s.buyer.signed(buy);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::ComplicationNotAllowed(_)));
    }

    #[test]
    fn exec_params_must_agree() {
        let mut s = setup();
        let (sell, mut buy) = orders(&s, 10_000);
        buy.exec_params.currency = Address::repeat(0xef);
        let buy = s.buyer.signed(buy);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::ExecParamsMismatch));
    }

    #[test]
    fn slippage_floor_is_enforced() {
        let mut s = setup();
        let (mut sell, buy) = orders(&s, 10_000);
        // 150 bps fee leaves the seller 9850 bps.
        sell.min_bps_to_seller = 9_900;
        let sell = s.seller.signed(sell);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::SlippageViolation { min_bps: 9_900, .. }));
    }

    #[test]
    fn preflight_catches_missing_funds_and_approval() {
        let mut s = setup();
        let (sell, buy) = orders(&s, 200_000);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell.clone()], &[buy.clone()], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::InsufficientBalance { .. }));
        assert!(s.engine.is_nonce_valid(&sell.signer, sell.nonce));

        let mut s = setup();
        s.engine
            .asset_ledger_mut()
            .set_approval_for_all(&punks(), &s.seller.address(), &exchange(), false);
        let (sell, buy) = orders(&s, 10_000);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::NotApproved { .. }));
    }

    #[test]
    fn failed_transfer_rolls_back_pair() {
        let mut s = setup();
        s.engine.asset_ledger_mut().pause(punks());
        let (sell, buy) = orders(&s, 10_000);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell.clone()], &[buy.clone()], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::TransferFailed { .. }));

        let currency = s.engine.currency_ledger();
        assert_eq!(currency.balance_of(&weth(), &s.buyer.address()), Decimal::new(100_000, 0));
        assert_eq!(currency.balance_of(&weth(), &s.seller.address()), Decimal::ZERO);
        assert_eq!(
            currency.allowance(&weth(), &s.buyer.address(), &exchange()),
            Decimal::new(100_000, 0)
        );
        assert!(s.engine.is_nonce_valid(&sell.signer, sell.nonce));
        assert!(s.engine.is_nonce_valid(&buy.signer, buy.nonce));
    }

    /// Currency ledger whose transfers cannot be reversed.
    struct IrreversibleCurrency(InMemoryCurrency);

    impl CurrencyLedger for IrreversibleCurrency {
        fn balance_of(&self, currency: &Address, owner: &Address) -> Amount {
            self.0.balance_of(currency, owner)
        }

        fn allowance(&self, currency: &Address, owner: &Address, spender: &Address) -> Amount {
            self.0.allowance(currency, owner, spender)
        }

        fn transfer_from(
            &mut self,
            currency: &Address,
            spender: &Address,
            from: &Address,
            to: &Address,
            amount: Amount,
        ) -> Result<()> {
            self.0.transfer_from(currency, spender, from, to, amount)
        }

        fn revert_transfer(&mut self, currency: &Address, _: &Address, _: &Address, _: &Address, _: Amount) -> Result<()> {
            Err(BundlematchError::Internal(format!("{currency} transfers are final")))
        }
    }

    #[test]
    fn incomplete_rollback_is_reported() {
        let s = setup();
        let (sell, buy) = orders(&s, 10_000);
        let config = s.engine.config().clone();
        let mut currency = InMemoryCurrency::new();
        currency.deposit(&weth(), &s.buyer.address(), Decimal::new(100_000, 0));
        currency.approve(&weth(), &s.buyer.address(), &exchange(), Decimal::new(100_000, 0));
        let mut assets = InMemoryAssets::new();
        assets.mint(&punks(), 0, &s.seller.address(), 1);
        assets.set_approval_for_all(&punks(), &s.seller.address(), &exchange(), true);
        assets.pause(punks());

        let mut engine = SettlementEngine::new(
            config.clone(),
            IrreversibleCurrency(currency),
            assets,
            StaticFeePolicy::from_config(&config.fees),
            CurrencyRegistry::with([weth()]),
        )
        .unwrap();
        engine.register_complication(Address::repeat(0xcc), Box::new(OrderBookComplication::from_config(&config)));

        let err = engine
            .take_orders_at(&s.buyer.address(), &[sell.clone()], &[buy.clone()], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::SupplyInvariantViolation { .. }), "got {err:?}");
        // Nonces are still released even though the payment could not be undone.
        assert!(engine.is_nonce_valid(&sell.signer, sell.nonce));
        assert!(engine.is_nonce_valid(&buy.signer, buy.nonce));
    }

    #[test]
    fn tampered_order_is_rejected() {
        let mut s = setup();
        let (mut sell, buy) = orders(&s, 10_000);
        sell.start_price = Decimal::new(1, 0);
        sell.end_price = Decimal::new(1, 0);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[sell.clone()], &[buy], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::InvalidSignature(id) if id == sell.id));
        assert!(!s.engine.verify_order_sig(&sell));
    }

    #[test]
    fn sides_must_match_positions() {
        let mut s = setup();
        let (sell, buy) = orders(&s, 10_000);
        let err = s
            .engine
            .take_orders_at(&s.buyer.address(), &[buy], &[sell], true, NOW)
            .unwrap_err();
        assert!(matches!(err, BundlematchError::InvalidOrder { .. }));
    }
}
