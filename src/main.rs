//! Metaball Field entry point
//!
//! On the web: sizes the background canvas, builds the program and runs the
//! frame loop. Natively: a headless dry run that builds the program and
//! prints a coarse preview of the field.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_field {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent};

    use metaball_field::preferences::{self, Preferences, Theme};
    use metaball_field::renderer::{MetaballRenderState, ProgramSpec, ShaderProgram};
    use metaball_field::sim::Field;
    use metaball_field::{FrameDriver, InitError};

    type Driver = FrameDriver<MetaballRenderState>;

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger was already initialised".into());
        }

        log::info!("Metaball field starting...");

        Preferences::detect().apply();
        setup_theme_keys();

        match start().await {
            Ok(driver) => {
                request_animation_frame(driver);
                log::info!("Metaball field running!");
            }
            Err(e) => log::error!("Metaball field failed to start: {e}"),
        }
    }

    fn host(what: &str) -> InitError {
        InitError::Host(what.to_string())
    }

    async fn start() -> Result<Rc<RefCell<Driver>>, InitError> {
        let window = web_sys::window().ok_or_else(|| host("no window"))?;
        let document = window.document().ok_or_else(|| host("no document"))?;

        let canvas: HtmlCanvasElement = document
            .query_selector(".background")
            .ok()
            .flatten()
            .ok_or_else(|| host("no .background canvas"))?
            .dyn_into()
            .map_err(|_| host(".background is not a canvas"))?;

        // Canvas pixels match CSS pixels; the physics bounds use the same size
        let root = document
            .document_element()
            .ok_or_else(|| host("no document element"))?;
        let width = root.client_width().max(0) as u32;
        let height = root.client_height().max(0) as u32;
        if width == 0 || height == 0 {
            return Err(InitError::Host(format!(
                "viewport is empty ({width}x{height})"
            )));
        }
        canvas.set_width(width);
        canvas.set_height(height);

        let seed = js_sys::Date::now() as u64;
        let field = Field::new(width, height, &mut Pcg32::seed_from_u64(seed));
        log::info!(
            "Viewport {}x{}, {} metaballs, seed {}",
            width,
            height,
            field.len(),
            seed
        );

        let program = ShaderProgram::build(ProgramSpec::new(width, height, field.len()))?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = MetaballRenderState::new(surface, &adapter, &program).await?;
        Ok(Rc::new(RefCell::new(FrameDriver::new(field, render_state))))
    }

    /// Development shortcut for flipping the theme
    fn setup_theme_keys() {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let Some(theme) = Theme::from_key(&event.key()) else {
                return;
            };
            if let Some(body) = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.body())
            {
                preferences::set_attribute(&body, theme);
            }
        });
        let _ =
            window.add_event_listener_with_callback("keypress", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(driver: Rc<RefCell<Driver>>) {
        let Some(window) = web_sys::window() else {
            log::error!("No window to schedule frames on");
            return;
        };
        // Frees itself once the browser has called it
        let callback = Closure::once_into_js(move |_time: f64| {
            frame_loop(driver);
        });
        let _ = window.request_animation_frame(callback.unchecked_ref());
    }

    fn frame_loop(driver: Rc<RefCell<Driver>>) {
        driver.borrow_mut().step();
        request_animation_frame(driver);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_field::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::process::ExitCode;

    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use metaball_field::renderer::{ProgramSpec, ShaderProgram};
    use metaball_field::sim::{self, Field, Snapshot};
    use metaball_field::{FrameDriver, FrameTarget};

    const DEFAULT_SIZE: (u32, u32) = (800, 600);
    const DEFAULT_SEED: u64 = 12345;
    /// Ten seconds at 60 Hz
    const DRY_RUN_FRAMES: u32 = 600;
    const PREVIEW_COLUMNS: u32 = 64;
    const PREVIEW_ROWS: u32 = 24;

    /// Keeps the latest snapshot instead of drawing it
    #[derive(Default)]
    struct LastFrame {
        snapshot: Snapshot,
    }

    impl FrameTarget for LastFrame {
        fn render_frame(&mut self, snapshot: &Snapshot) {
            self.snapshot = snapshot.clone();
        }
    }

    fn parse_args(args: &[String]) -> Result<(u32, u32, u64), String> {
        let number = |i: usize, name: &str| -> Result<Option<u64>, String> {
            args.get(i)
                .map(|s| s.parse::<u64>().map_err(|e| format!("invalid {name} '{s}': {e}")))
                .transpose()
        };
        let width = number(0, "width")?.map_or(Ok(DEFAULT_SIZE.0), |w| {
            u32::try_from(w).map_err(|e| format!("width {w}: {e}"))
        })?;
        let height = number(1, "height")?.map_or(Ok(DEFAULT_SIZE.1), |h| {
            u32::try_from(h).map_err(|e| format!("height {h}: {e}"))
        })?;
        let seed = number(2, "seed")?.unwrap_or(DEFAULT_SEED);
        Ok((width, height, seed))
    }

    /// Character for a shaded cell: `.` for black, `+` for the dark rim,
    /// `#` for the lit inside.
    fn cell_char(color: [f32; 4]) -> char {
        let brightness = color[0].max(color[1]).max(color[2]);
        if brightness <= 0.0 {
            '.'
        } else if brightness < 0.5 {
            '+'
        } else {
            '#'
        }
    }

    /// One character per cell, sampled at the cell center. Top row first.
    fn preview(snapshot: &Snapshot, width: u32, height: u32) -> String {
        let size = Vec2::new(width as f32, height as f32);
        let cell = size / Vec2::new(PREVIEW_COLUMNS as f32, PREVIEW_ROWS as f32);
        let mut out = String::new();
        for row in (0..PREVIEW_ROWS).rev() {
            for col in 0..PREVIEW_COLUMNS {
                let p = (Vec2::new(col as f32, row as f32) + 0.5) * cell;
                out.push(cell_char(sim::shade(sim::potential(snapshot, p), p, size)));
            }
            out.push('\n');
        }
        out
    }

    pub fn run(args: &[String]) -> ExitCode {
        let (width, height, seed) = match parse_args(args) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::error!("{e}");
                eprintln!("usage: metaball-field [WIDTH HEIGHT [SEED]]");
                return ExitCode::from(2);
            }
        };

        let field = Field::new(width, height, &mut Pcg32::seed_from_u64(seed));
        log::info!(
            "Viewport {}x{}, {} metaballs, seed {}",
            width,
            height,
            field.len(),
            seed
        );

        let program = match ShaderProgram::build(ProgramSpec::new(width, height, field.len())) {
            Ok(program) => program,
            Err(e) => {
                log::error!("Shader program failed: {e}");
                return ExitCode::FAILURE;
            }
        };
        log::info!(
            "Program ok: position at location {}, metaballs at group {} binding {}",
            program.bindings.position_location,
            program.bindings.metaballs.group,
            program.bindings.metaballs.binding
        );

        let mut driver = FrameDriver::new(field, LastFrame::default());
        for _ in 0..DRY_RUN_FRAMES {
            driver.step();
        }

        println!("After {} frames:", driver.frames());
        print!("{}", preview(&driver.target().snapshot, width, height));
        ExitCode::SUCCESS
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("Metaball field (native dry run)");
    let args: Vec<String> = std::env::args().skip(1).collect();
    native::run(&args)
}
