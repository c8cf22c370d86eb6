//! Coffee Rush entry point
//!
//! On the web this wires the DOM (canvas, HUD, buttons, input) to the frame
//! driver. Natively it plays autopiloted runs headlessly on a fake clock and
//! prints the results.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlInputElement, KeyboardEvent,
        MouseEvent, TouchEvent,
    };

    use coffee_rush::highscores::{KvScoreStore, format_relative};
    use coffee_rush::persistence::LocalStorageStore;
    use coffee_rush::platform::input::combine;
    use coffee_rush::platform::{Clock, DragTracker, HeldKeys, SystemClock};
    use coffee_rush::renderer::{FrameSnapshot, RenderSink};
    use coffee_rush::sim::{CollectibleKind, GamePhase};
    use coffee_rush::{Game, GameError, LoopControl, Settings, Tuning};

    /// Browser app: the game plus raw input state and the canvas
    struct App {
        game: Game<SystemClock>,
        keys: HeldKeys,
        drag: DragTracker,
        sink: CanvasSink,
        settings_store: LocalStorageStore,
        document: Document,
        /// A requestAnimationFrame callback is pending
        scheduled: bool,
    }

    /// Draws frame snapshots onto a 2D canvas
    struct CanvasSink {
        ctx: CanvasRenderingContext2d,
    }

    impl RenderSink for CanvasSink {
        fn present(&mut self, frame: &FrameSnapshot) {
            let ctx = &self.ctx;
            let (w, h) = (frame.width as f64, frame.height as f64);
            ctx.clear_rect(0.0, 0.0, w, h);

            // Ground
            ctx.set_fill_style_str("#3b2a1e");
            ctx.fill_rect(0.0, frame.ground_y as f64, w, h - frame.ground_y as f64);

            ctx.set_fill_style_str("rgba(20, 20, 20, 0.8)");
            for spill in &frame.oil_spills {
                ctx.begin_path();
                for (i, p) in spill.world_points().enumerate() {
                    if i == 0 {
                        ctx.move_to(p.x as f64, p.y as f64);
                    } else {
                        ctx.line_to(p.x as f64, p.y as f64);
                    }
                }
                ctx.close_path();
                ctx.fill();
            }

            ctx.set_fill_style_str("#777777");
            for obstacle in &frame.obstacles {
                circle(ctx, obstacle.pos.x, obstacle.pos.y, obstacle.radius);
            }

            for item in &frame.collectibles {
                ctx.set_fill_style_str(match item.kind {
                    CollectibleKind::Regular => "#6f4e37",
                    CollectibleKind::Coffee => "#f5deb3",
                    CollectibleKind::Magnet => "#d62828",
                });
                circle(ctx, item.pos.x, item.pos.y, item.radius);
            }

            ctx.set_stroke_style_str("#ff2a2a");
            for laser in frame.lasers.iter().filter(|l| l.active) {
                ctx.set_line_width(laser.width as f64);
                ctx.begin_path();
                if let Some(first) = laser.trail.front() {
                    ctx.move_to(first.x as f64, first.y as f64);
                    ctx.line_to(laser.head.x as f64, laser.head.y as f64);
                    ctx.stroke();
                }
                ctx.set_fill_style_str("#ffffff");
                circle(ctx, laser.head.x, laser.head.y, laser.width);
            }

            ctx.set_fill_style_str(if frame.hud.rush_remaining_ms > 0 {
                "#ffb703"
            } else {
                "#e9c46a"
            });
            circle(ctx, frame.ball.pos.x, frame.ball.pos.y, frame.ball.radius);
        }
    }

    fn circle(ctx: &CanvasRenderingContext2d, x: f32, y: f32, r: f32) {
        ctx.begin_path();
        if ctx.arc(x as f64, y as f64, r as f64, 0.0, TAU).is_ok() {
            ctx.fill();
        }
    }

    fn js_err(e: GameError) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    fn show(document: &Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    pub fn run() -> Result<(), JsValue> {
        coffee_rush::platform::web::init();

        let window = web_sys::window().ok_or_else(|| js_err(GameError::MissingHandle("window")))?;
        let document = window
            .document()
            .ok_or_else(|| js_err(GameError::MissingHandle("document")))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or_else(|| js_err(GameError::MissingHandle("canvas")))?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| js_err(GameError::MissingHandle("2d context")))?
            .dyn_into()?;

        let width = canvas.client_width().max(1) as u32;
        let height = canvas.client_height().max(1) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let settings_store = LocalStorageStore::open().map_err(js_err)?;
        let settings = Settings::load(&settings_store);
        let tuning = Tuning::default();
        let scores = KvScoreStore::new(LocalStorageStore::open().map_err(js_err)?, tuning.leaderboard.capacity);

        let seed = js_sys::Date::now() as u64;
        let game = Game::new(
            tuning,
            SystemClock::new(),
            Box::new(scores),
            width as f32,
            height as f32,
            seed,
        )
        .map_err(js_err)?
        .with_settings(settings);
        log::info!("Game initialized with seed: {}", seed);

        if let Some(input) = document
            .get_element_by_id("name-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            input.set_value(&game.settings().player_name);
        }
        show(&document, "name-prompt", game.settings().needs_name());

        let app = Rc::new(RefCell::new(App {
            game,
            keys: HeldKeys::default(),
            drag: DragTracker::default(),
            sink: CanvasSink { ctx },
            settings_store,
            document: document.clone(),
            scheduled: false,
        }));

        setup_keyboard(&window, app.clone())?;
        setup_pointer(&canvas, app.clone())?;
        setup_buttons(&document, app.clone())?;
        setup_resize(&window, canvas.clone(), app.clone())?;

        {
            let mut a = app.borrow_mut();
            let frame = a.game.snapshot();
            a.sink.present(&frame);
            update_hud(&a);
        }
        log::info!("Coffee Rush ready");
        Ok(())
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        app.borrow_mut().scheduled = true;
        let closure = Closure::once(move |_time: f64| {
            game_loop(app);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>) {
        let control = {
            let mut a = app.borrow_mut();
            a.scheduled = false;
            let axes = combine(&a.keys, &a.drag);
            a.game.set_input(axes);
            let control = a.game.frame();
            a.game.take_events();

            let frame = a.game.snapshot();
            a.sink.present(&frame);
            update_hud(&a);
            control
        };

        if control == LoopControl::Continue {
            request_animation_frame(app);
        }
    }

    /// Start (or restart) a run and make sure the loop is scheduled
    fn start_run(app: &Rc<RefCell<App>>) {
        let needs_frame = {
            let mut a = app.borrow_mut();
            if let Some(input) = a
                .document
                .get_element_by_id("name-input")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            {
                let name = input.value();
                a.game.set_player_name(Some(&name));
                let settings = a.game.settings().clone();
                if let Err(e) = settings.save(&mut a.settings_store) {
                    log::warn!("Could not save settings: {}", e);
                }
            }
            if a.game.start().is_err() {
                return;
            }
            show(&a.document, "start-menu", false);
            show(&a.document, "name-prompt", false);
            show(&a.document, "game-over", false);
            !a.scheduled
        };
        if needs_frame {
            request_animation_frame(app.clone());
        }
    }

    fn update_hud(app: &App) {
        let doc = &app.document;
        let hud = app.game.hud();
        set_text(doc, "hud-score", &hud.score.to_string());
        set_text(doc, "hud-health", &format!("{:.0}%", hud.health_percent));
        show(doc, "hud-rush", hud.rush_remaining_ms > 0);
        set_text(doc, "hud-rush-time", &format!("{}s", hud.rush_remaining_ms.div_ceil(1000)));
        show(doc, "hud-magnet", hud.magnet_remaining_ms > 0);
        set_text(doc, "hud-magnet-time", &format!("{}s", hud.magnet_remaining_ms.div_ceil(1000)));
        show(doc, "start-menu", hud.phase == GamePhase::Menu);

        let over = hud.phase == GamePhase::GameOver;
        show(doc, "game-over", over);
        if over {
            set_text(doc, "final-score", &hud.score.to_string());
            let reward = app
                .game
                .reward_tier()
                .map(|t| format!("You earned {} tokens!", t.amount))
                .unwrap_or_default();
            set_text(doc, "reward", &reward);

            let now = SystemClock::new().timestamp_ms();
            let rows: Vec<String> = app
                .game
                .leaderboard()
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    format!(
                        "{}. {} - {} ({})",
                        i + 1,
                        e.player_name,
                        e.score,
                        format_relative(now, e.timestamp)
                    )
                })
                .collect();
            set_text(doc, "leaderboard", &rows.join("\n"));
        }
    }

    fn setup_keyboard(window: &web_sys::Window, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        for (event_name, pressed) in [("keydown", true), ("keyup", false)] {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if app.borrow_mut().keys.set(&event.key(), pressed) {
                    event.prevent_default();
                }
            });
            window.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Release everything when focus is lost
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
            let mut a = app.borrow_mut();
            a.keys.clear();
            a.drag.end();
        });
        window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn setup_pointer(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        // Mouse drag
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                app.borrow_mut()
                    .drag
                    .begin(event.offset_x() as f32, event.offset_y() as f32);
            });
            canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut a = app.borrow_mut();
                if a.drag.is_dragging() {
                    a.drag.move_to(event.offset_x() as f32, event.offset_y() as f32);
                }
            });
            canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        for event_name in ["mouseup", "mouseleave"] {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                app.borrow_mut().drag.end();
            });
            canvas.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Touch drag
        for (event_name, starts) in [("touchstart", true), ("touchmove", false)] {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let rect = canvas_clone.get_bounding_client_rect();
                    let x = touch.client_x() as f32 - rect.left() as f32;
                    let y = touch.client_y() as f32 - rect.top() as f32;
                    let mut a = app.borrow_mut();
                    if starts {
                        a.drag.begin(x, y);
                    } else {
                        a.drag.move_to(x, y);
                    }
                }
            });
            canvas.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: TouchEvent| {
            app.borrow_mut().drag.end();
        });
        canvas.add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn setup_buttons(document: &Document, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        for id in ["start-btn", "restart-btn"] {
            if let Some(btn) = document.get_element_by_id(id) {
                let app = app.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    start_run(&app);
                });
                btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
                closure.forget();
            }
        }

        if let Some(btn) = document.get_element_by_id("menu-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut a = app.borrow_mut();
                if let Err(e) = a.game.return_to_menu() {
                    log::warn!("Ignoring menu button: {}", e);
                    return;
                }
                update_hud(&a);
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn setup_resize(
        window: &web_sys::Window,
        canvas: HtmlCanvasElement,
        app: Rc<RefCell<App>>,
    ) -> Result<(), JsValue> {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let width = canvas.client_width().max(1) as u32;
            let height = canvas.client_height().max(1) as u32;
            canvas.set_width(width);
            canvas.set_height(height);
            if let Err(e) = app.borrow_mut().game.resize(width as f32, height as f32) {
                log::warn!("Resize rejected: {}", e);
            }
        });
        window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use coffee_rush::highscores::{KvScoreStore, format_relative};
    use coffee_rush::persistence::MemoryStore;
    use coffee_rush::platform::{Clock, FakeClock};
    use coffee_rush::renderer::{FrameSnapshot, RenderSink, pack};
    use coffee_rush::sim::GameEvent;
    use coffee_rush::{Game, LoopControl, Result, Tuning};

    /// Simulated frame length (a 60 Hz display)
    const FRAME_MS: u64 = 16;
    /// Give up on a run after this much simulated time
    const MAX_RUN_MS: u64 = 5 * 60 * 1000;
    const RUNS: usize = 3;

    /// Logs a one-line summary of the frame every few seconds
    struct LogSink {
        every_ms: u64,
        last_ms: u64,
        now_ms: u64,
    }

    impl RenderSink for LogSink {
        fn present(&mut self, frame: &FrameSnapshot) {
            if self.now_ms < self.last_ms + self.every_ms {
                return;
            }
            self.last_ms = self.now_ms;
            let packed = pack(frame);
            log::debug!(
                "t={}s score={} health={:.0}% instances={} trail={}",
                self.now_ms / 1000,
                frame.hud.score,
                frame.hud.health_percent,
                packed.uniform.instance_count,
                packed.uniform.trail_count
            );
        }
    }

    pub fn run(seed: u64, tuning: Tuning) -> Result<()> {
        let clock = FakeClock::new(0);
        let store = KvScoreStore::new(MemoryStore::new(), tuning.leaderboard.capacity);
        let mut game = Game::new(tuning, clock.clone(), Box::new(store), 800.0, 600.0, seed)?;
        game.set_player_name(Some("Autopilot"));
        game.set_idle_mode(true);
        let mut sink = LogSink {
            every_ms: 5000,
            last_ms: 0,
            now_ms: 0,
        };

        for run in 1..=RUNS {
            game.start()?;
            let started = clock.now_ms();
            let mut pickups = 0;
            let mut laser_hits = 0;
            let mut timed_out = false;

            loop {
                clock.advance(FRAME_MS);
                let control = game.frame();
                for event in game.take_events() {
                    match event {
                        GameEvent::Collected { .. } => pickups += 1,
                        GameEvent::LaserHit { .. } => laser_hits += 1,
                        _ => {}
                    }
                }
                sink.now_ms = clock.now_ms() - started;
                sink.present(&game.snapshot());

                if control == LoopControl::Stop {
                    break;
                }
                if !timed_out && clock.now_ms() - started > MAX_RUN_MS {
                    log::warn!("Run {} hit the time limit; stopping it", run);
                    game.stop_handle().cancel();
                    timed_out = true;
                }
            }
            sink.last_ms = 0;

            let secs = (clock.now_ms() - started) as f64 / 1000.0;
            match game.final_score() {
                Some(score) => println!(
                    "Run {}: score {} in {:.1}s ({} pickups, {} laser hits)",
                    run, score, secs, pickups, laser_hits
                ),
                None => println!("Run {}: stopped after {:.1}s with score {}", run, secs, game.hud().score),
            }
            match game.reward_tier() {
                Some(tier) => println!("  reward tier {}: {} tokens", tier.tier, tier.amount),
                None => println!("  no reward"),
            }

            // Separate runs in wall-clock time so "ago" labels differ
            clock.advance(60_000);
        }

        println!("\nLeaderboard:");
        let now = clock.timestamp_ms();
        for (i, entry) in game.leaderboard().iter().enumerate() {
            println!(
                "{:>2}. {:<12} {:>6}  {}",
                i + 1,
                entry.player_name,
                entry.score,
                format_relative(now, entry.timestamp)
            );
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Coffee Rush (native, headless) starting...");

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345);
    let tuning = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| coffee_rush::GameError::InvalidTuning(format!("{path}: {e}")))
            .and_then(|json| coffee_rush::Tuning::from_json(&json))
        {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Could not load tuning: {}", e);
                std::process::exit(2);
            }
        },
        None => coffee_rush::Tuning::default(),
    };

    if let Err(e) = headless::run(seed, tuning) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
