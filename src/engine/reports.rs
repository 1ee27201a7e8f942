/// Coarse usage proxy: ten points per booking, capped at 100.
///
/// This is not time occupancy; see `availability::occupancy` for that.
pub fn usage_percentage(booking_count: usize) -> u8 {
    booking_count.saturating_mul(10).min(100) as u8
}
