use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use robot_core::encoder::Side;
use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Drive)?;
    record_profile(TranscriptProfile::Schedule)?;
    record_profile(TranscriptProfile::Battery)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    let script: &[&str] = match profile {
        TranscriptProfile::Drive => &[
            "help distance",
            "distance 0.1 0",
            "wait 1500ms",
            "encoder",
            "distance 0 1.5708 for 2s",
            "wait 2s",
            "velocity 0.1 0 for 1s",
            "wait 1100ms",
            "pwm 120 -120 for 250ms",
            "wait 300ms",
            "info",
        ],
        TranscriptProfile::Schedule => &[
            "add 1.5 2",
            "div 1 0",
            "time",
            "time every 100ms loop",
            "wait 350ms",
            "time cancel",
            "encoder every 50ms",
            "wait 200ms",
            "encoder cancel",
            "info every 250ms",
            "wait 600ms",
            "restart",
            "wait 300ms",
            "pwm 1.5 2",
        ],
        TranscriptProfile::Battery => &["battery", "battery every 1s", "wait 3500ms", "battery cancel"],
    };

    for line in script {
        let _ = session.handle_command(line)?;
    }

    println!(
        "{}: {} (wheels L={:.4}m R={:.4}m)",
        profile.header(),
        profile.log_path(),
        session.position(Side::Left),
        session.position(Side::Right),
    );
    Ok(())
}
