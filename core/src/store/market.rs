//! Store methods for monthly firm positions and market reports.

use crate::{
    error::SimResult,
    market::FirmStatus,
    metrics::{FirmMonthRecord, MarketReport, SpendBands},
};
use rusqlite::params;

use super::SimStore;

/// How a row of `affordability_band` groups its households.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandGrouping {
    Quadrant,
    IncomeQuartile,
}

impl BandGrouping {
    fn as_str(self) -> &'static str {
        match self {
            BandGrouping::Quadrant       => "quadrant",
            BandGrouping::IncomeQuartile => "income_quartile",
        }
    }
}

fn status_str(status: FirmStatus) -> &'static str {
    match status {
        FirmStatus::Solvent  => "solvent",
        FirmStatus::Bankrupt => "bankrupt",
    }
}

impl SimStore {
    pub fn insert_firm_month(&self, run_id: &str, r: &FirmMonthRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO firm_month (
                run_id, month, firm_id, name, profit, savings, status, mobile_subs, fixed_subs
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                r.month as i64,
                r.firm as i64,
                &r.name,
                r.profit,
                r.savings,
                status_str(r.status),
                r.mobile_subs as i64,
                r.fixed_subs as i64,
            ],
        )?;
        Ok(())
    }

    pub fn insert_market_report(&self, run_id: &str, r: &MarketReport) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO market_report (
                run_id, month, hhi_mobile, hhi_fixed, mean_price_per_gb,
                complete, mobile_only, fixed_only, disconnected,
                mean_switching_cost, real_problems, network_wholesale_revenue, solvent_firms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                run_id,
                r.month as i64,
                r.hhi_mobile,
                r.hhi_fixed,
                r.mean_price_per_gb,
                r.complete as i64,
                r.mobile_only as i64,
                r.fixed_only as i64,
                r.disconnected as i64,
                r.mean_switching_cost,
                r.real_problems as i64,
                r.network_wholesale_revenue,
                r.solvent_firms as i64,
            ],
        )?;

        for (i, bands) in r.by_quadrant.iter().enumerate() {
            self.insert_band(run_id, r.month, BandGrouping::Quadrant, i, bands, r.min_good_bundle_price[i])?;
        }
        for (i, bands) in r.by_income_quartile.iter().enumerate() {
            self.insert_band(run_id, r.month, BandGrouping::IncomeQuartile, i, bands, None)?;
        }
        Ok(())
    }

    fn insert_band(
        &self,
        run_id: &str,
        month: u64,
        grouping: BandGrouping,
        index: usize,
        b: &SpendBands,
        min_good_bundle_price: Option<f64>,
    ) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO affordability_band (
                run_id, month, grouping, group_index,
                under_2, under_5, under_10, at_least_10, partial, disconnected,
                min_good_bundle_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                month as i64,
                grouping.as_str(),
                index as i64,
                b.under_2 as i64,
                b.under_5 as i64,
                b.under_10 as i64,
                b.at_least_10 as i64,
                b.partial as i64,
                b.disconnected as i64,
                min_good_bundle_price,
            ],
        )?;
        Ok(())
    }

    /// Stored bands of one report month, in group order.
    pub fn affordability_bands(
        &self,
        run_id: &str,
        month: u64,
        grouping: BandGrouping,
    ) -> SimResult<Vec<SpendBands>> {
        let mut stmt = self.conn.prepare(
            "SELECT under_2, under_5, under_10, at_least_10, partial, disconnected
             FROM affordability_band
             WHERE run_id = ?1 AND month = ?2 AND grouping = ?3
             ORDER BY group_index ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, month as i64, grouping.as_str()], |row| {
                let count = |i: usize| row.get::<_, i64>(i).map(|v| v as usize);
                Ok(SpendBands {
                    under_2:      count(0)?,
                    under_5:      count(1)?,
                    under_10:     count(2)?,
                    at_least_10:  count(3)?,
                    partial:      count(4)?,
                    disconnected: count(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Savings trajectory of one firm, in month order.
    pub fn firm_savings_history(&self, run_id: &str, firm: usize) -> SimResult<Vec<(u64, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT month, savings FROM firm_month
             WHERE run_id = ?1 AND firm_id = ?2
             ORDER BY month ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, firm as i64], |row| {
                Ok((row.get::<_, i64>(0)? as u64, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Test / summary helpers ────────────────────────────────────────

    /// Number of market reports persisted (for tests).
    pub fn market_report_count(&self, run_id: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM market_report WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Months with a bankrupt row for `firm` (for tests).
    pub fn bankrupt_months(&self, run_id: &str, firm: usize) -> SimResult<Vec<u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT month FROM firm_month
             WHERE run_id = ?1 AND firm_id = ?2 AND status = 'bankrupt'
             ORDER BY month ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, firm as i64], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(|m| m as u64))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
