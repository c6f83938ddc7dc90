use embassy_futures::select::select;
use embassy_stm32::exti::ExtiInput;
use robot_core::encoder::Side;

use super::ENCODERS;

/// Decodes one wheel: any edge on A or B samples both lines.
///
/// Spawned on the interrupt executor, so it preempts the control loop.
#[embassy_executor::task(pool_size = 2)]
pub async fn run(side: Side, mut a: ExtiInput<'static>, mut b: ExtiInput<'static>) -> ! {
    let level_b = b.is_high();
    ENCODERS.prime(side, a.is_high() ^ level_b, level_b);
    defmt::info!("encoder: {} wheel armed", side_label(side));

    loop {
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;
        let level_b = b.is_high();
        ENCODERS.on_edge(side, a.is_high() ^ level_b, level_b);
    }
}

const fn side_label(side: Side) -> &'static str {
    match side {
        Side::Left => "left",
        Side::Right => "right",
    }
}
