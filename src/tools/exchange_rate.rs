//! Demo exchange-rate tool. Always answers with a fixed THB/USD rate.

/// Baht per US dollar.
pub const THB_PER_USD: f64 = 36.50;

/// Alternate names the model may use for this tool.
pub const ALIASES: &[&str] = &["ตรวจสอบอัตราแลกเปลี่ยน", "อัตราแลกเปลี่ยน", "ดูอัตราแลกเปลี่ยน", "check_exchange_rate"];

/// Input is ignored.
pub fn get_exchange_rate(_input: &str) -> String {
    format!("Today's exchange rate is {THB_PER_USD:.2} THB/USD ({THB_PER_USD:.2} บาท/ดอลลาร์)")
}
