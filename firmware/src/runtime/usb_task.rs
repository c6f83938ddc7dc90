use embassy_futures::join::join;
use embassy_futures::select::{Either3, select3};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::driver::{Driver, EndpointError};

use super::{LINK, USB_STORAGE};
use crate::link::{LINK_FRAME_CAPACITY, LinkFrame};
use crate::status;
use crate::usb::{self, UsbDeviceStrings};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let usb::UsbLink { mut device, port } =
        usb::UsbLink::new(driver, storage, UsbDeviceStrings::default());
    let usb::CdcAcmHandle {
        sender,
        receiver,
        control,
    } = port;

    join(device.run(), run_link_interface(sender, receiver, control)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn run_link_interface<D>(
    mut sender: Sender<'static, D>,
    mut receiver: Receiver<'static, D>,
    control: ControlChanged<'static>,
) -> !
where
    D: Driver<'static>,
{
    let inbound = LINK.host_to_robot_sender();
    let outbound = LINK.robot_to_host_receiver();
    let mut ingress = [0u8; usb::MAX_PACKET_SIZE as usize];
    let mut pending_tx: Option<LinkFrame> = None;

    loop {
        join(receiver.wait_connection(), sender.wait_connection()).await;
        wait_for_dtr(&control, &mut sender).await;

        // Replies queued for a previous session are stale.
        pending_tx.take();
        while outbound.try_receive().is_ok() {}
        status::record_link_attached(true);
        defmt::info!("usb: link connected");

        loop {
            match select3(
                receiver.read_packet(&mut ingress),
                async {
                    // The frame stays pending until written, so a read that
                    // wins the select cannot lose it.
                    if pending_tx.is_none() {
                        pending_tx = Some(outbound.receive().await);
                    }
                    if let Some(frame) = pending_tx.as_ref() {
                        sender.write_packet(frame).await?;
                    }
                    pending_tx = None;
                    Ok::<(), EndpointError>(())
                },
                control.control_changed(),
            )
            .await
            {
                Either3::First(Ok(0)) => {}
                Either3::First(Ok(count)) => {
                    for chunk in ingress[..count].chunks(LINK_FRAME_CAPACITY) {
                        let mut frame = LinkFrame::new();
                        // `chunks` never yields more than the frame holds.
                        let _ = frame.extend_from_slice(chunk);
                        inbound.send(frame).await;
                    }
                }
                Either3::First(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: link interface disabled");
                    break;
                }
                Either3::First(Err(_)) => {
                    defmt::warn!("usb: link read error");
                }
                Either3::Second(Ok(())) => {}
                Either3::Second(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: link write disabled");
                    break;
                }
                Either3::Second(Err(_)) => {
                    defmt::warn!("usb: link write error");
                }
                Either3::Third(()) => {
                    if !sender.dtr() {
                        defmt::warn!("usb: host dropped DTR");
                        break;
                    }
                }
            }
        }

        status::record_link_attached(false);
    }
}

async fn wait_for_dtr<D>(control: &ControlChanged<'static>, sender: &mut Sender<'static, D>)
where
    D: Driver<'static>,
{
    while !sender.dtr() {
        control.control_changed().await;
    }
}
