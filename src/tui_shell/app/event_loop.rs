use tokio::sync::mpsc;

use super::runtime::Runtime;
use super::*;

const POLL: Duration = Duration::from_millis(50);

pub(super) fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runtime: &Runtime,
    refresh_rx: &mut mpsc::Receiver<RefreshMsg>,
    msg_rx: &mut mpsc::UnboundedReceiver<AppMsg>,
) -> Result<()> {
    let size = terminal.size().context("terminal size")?;
    app.resize(size.height);

    loop {
        while let Ok(m) = refresh_rx.try_recv() {
            runtime.execute_all(handle_msg(app, AppMsg::Refresh(m)));
        }
        while let Ok(m) = msg_rx.try_recv() {
            runtime.execute_all(handle_msg(app, m));
        }

        terminal
            .draw(|f| super::render::draw(f, app))
            .context("draw")?;
        if app.quit {
            return Ok(());
        }

        if event::poll(POLL).context("poll")? {
            match event::read().context("read event")? {
                Event::Key(k) if k.kind == KeyEventKind::Press => {
                    runtime.execute_all(handle_key(app, k));
                }
                Event::Resize(_, rows) => app.resize(rows),
                _ => {}
            }
        }
    }
}
