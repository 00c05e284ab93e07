use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use usbgadget::configfs::{HidFunction, UsbGadget, CONFIGFS_ROOT};
use usbgadget::keyboard::Keyboard;

/// Log level for the tool
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// usbgadget command line arguments
#[derive(Parser, Debug)]
#[command(name = "usbgadget")]
#[command(version, about = "Configure a USB HID keyboard gadget via ConfigFS", long_about = None)]
struct CliArgs {
    /// Gadget name under the configfs mount
    #[arg(short = 'n', long, value_name = "NAME", default_value = "usbgadget")]
    name: String,

    /// ConfigFS usb_gadget mount point
    #[arg(long, value_name = "DIR", default_value = CONFIGFS_ROOT)]
    configfs_root: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the keyboard gadget and bind it to a controller
    Up {
        /// USB vendor ID
        #[arg(long, value_name = "HEX", default_value = "0x1d6b", value_parser = parse_hex)]
        vendor_id: u16,

        /// USB product ID
        #[arg(long, value_name = "HEX", default_value = "0x0104", value_parser = parse_hex)]
        product_id: u16,

        /// Manufacturer string
        #[arg(long, default_value = "usbgadget")]
        manufacturer: String,

        /// Product string
        #[arg(long, default_value = "USB Keyboard Gadget")]
        product: String,

        /// Serial number string
        #[arg(long, default_value = "0123456789")]
        serial: String,

        /// Bind to this UDC instead of the first available one
        #[arg(long, value_name = "UDC")]
        udc: Option<String>,
    },

    /// Type text through the gadget's keyboard function
    Type {
        /// Text to type
        text: String,
    },

    /// Show gadget existence and UDC binding
    Status,

    /// Unbind and remove the gadget
    Down,
}

/// HID function instance name used by all subcommands
const KEYBOARD_FUNCTION: &str = "k0";

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    match args.command {
        Command::Up {
            vendor_id,
            product_id,
            manufacturer,
            product,
            serial,
            udc,
        } => {
            let gadget = UsbGadget::create_at(&args.name, &args.configfs_root)
                .context("failed to create gadget")?;

            gadget.set("idVendor", vendor_id)?;
            gadget.set("idProduct", product_id)?;
            gadget.set("bcdDevice", 0x0100u16)?;
            gadget.set("bcdUSB", 0x0200u16)?;

            let strings = gadget.strings("0x409")?;
            strings.set("serialnumber", serial.as_str())?;
            strings.set("manufacturer", manufacturer.as_str())?;
            strings.set("product", product.as_str())?;

            let config = gadget.config("c.1")?;
            config.set("bmAttributes", 0x80u16)?;
            config.set("MaxPower", 250u16)?;
            config
                .strings("0x409")?
                .set("configuration", "Keyboard configuration")?;

            let function = HidFunction::create(&gadget, KEYBOARD_FUNCTION)?;
            function.set_keyboard_defaults()?;
            gadget.link(&function, &config)?;

            gadget
                .activate(udc.as_deref())
                .context("failed to bind gadget to a controller")?;
            println!("gadget {} up", args.name);
        }

        Command::Type { text } => {
            let gadget = UsbGadget::create_at(&args.name, &args.configfs_root)
                .context("gadget does not exist")?;
            let function = HidFunction::open(&gadget, KEYBOARD_FUNCTION)
                .context("keyboard function does not exist")?;
            let mut keyboard =
                Keyboard::for_function(&function).context("failed to open keyboard device")?;
            keyboard.type_text(&text)?;
        }

        Command::Status => {
            let path = args.configfs_root.join(&args.name);
            if !path.is_dir() {
                println!("gadget {}: not present", args.name);
                return Ok(());
            }
            let gadget = UsbGadget::create_at(&args.name, &args.configfs_root)?;
            match gadget.bound_udc()? {
                Some(udc) => println!("gadget {}: bound to {}", args.name, udc),
                None => println!("gadget {}: present, not bound", args.name),
            }
        }

        Command::Down => {
            let gadget = UsbGadget::create_at(&args.name, &args.configfs_root)
                .context("gadget does not exist")?;
            gadget.deactivate().context("failed to unbind gadget")?;
            gadget.destroy().context("failed to destroy gadget")?;
            println!("gadget {} down", args.name);
        }
    }

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8) {
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "usbgadget=error",
        LogLevel::Warn => "usbgadget=warn",
        LogLevel::Info => "usbgadget=info",
        LogLevel::Debug => "usbgadget=debug",
        LogLevel::Trace => "usbgadget=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

fn parse_hex(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value {:?}: {}", s, e))
}
