use embassy_time::{Duration, Ticker};
use heapless::Vec;
use robot_core::protocol::Reply;

use super::{FirmwareRobot, LINK};
use crate::{link, status, telemetry};

const LOOP_PERIOD: Duration = Duration::from_millis(1);
/// Replies one iteration can produce before the rest are dropped.
const REPLY_BATCH: usize = 32;
/// Iterations between dropped-frame reports.
const DROP_REPORT_INTERVAL: u32 = 1_000;

/// The robot main loop: feed host bytes, poll, ship replies, log telemetry.
#[embassy_executor::task]
pub async fn run(mut robot: FirmwareRobot) -> ! {
    let inbound = LINK.host_to_robot_receiver();
    let outbound = LINK.robot_to_host_sender();
    let mut replies: Vec<Reply, REPLY_BATCH> = Vec::new();
    let mut cursor = robot.telemetry().next_event_id();
    let mut ticker = Ticker::every(LOOP_PERIOD);
    let mut iterations: u32 = 0;

    defmt::info!("control: loop running");

    loop {
        while let Ok(frame) = inbound.try_receive() {
            robot.receive(&frame, &mut replies);
        }
        robot.poll(&mut replies);

        // Nobody reads replies while the port is closed.
        if status::link_attached() {
            link::pack_replies(replies.iter().copied(), |frame| {
                if outbound.try_send(frame).is_err() {
                    status::record_dropped_frame();
                }
            });
        }
        replies.clear();

        for record in robot.telemetry().records_since(cursor) {
            telemetry::log_record(record);
        }
        cursor = robot.telemetry().next_event_id();

        iterations = iterations.wrapping_add(1);
        if iterations % DROP_REPORT_INTERVAL == 0 {
            let dropped = status::take_dropped_frames();
            if dropped > 0 {
                telemetry::log_dropped_frames(dropped);
            }
        }

        ticker.next().await;
    }
}
