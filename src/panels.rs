//! Visibility of the player's toolbar and its sub-panels.
//!
//! Each player carries one `PanelVisibility`. The toolbar flag gates every
//! sub-toggle button and sub-panel; the speed and volume panels share one
//! slot, so opening either closes the other. Closing the toolbar leaves the
//! sub-panel flags alone and reopening it restores the previous layout.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Toolbar,
    Speed,
    Volume,
    TimeRatio,
}

impl Panel {
    pub fn label(&self) -> &'static str {
        match self {
            Panel::Toolbar => "toolbar",
            Panel::Speed => "speed",
            Panel::Volume => "volume",
            Panel::TimeRatio => "time",
        }
    }

    /// The panel that cannot be open at the same time as this one
    fn exclusive_partner(&self) -> Option<Panel> {
        match self {
            Panel::Speed => Some(Panel::Volume),
            Panel::Volume => Some(Panel::Speed),
            Panel::Toolbar | Panel::TimeRatio => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelVisibility {
    toolbar: bool,
    speed: bool,
    volume: bool,
    time_ratio: bool,
}

impl PanelVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one panel. Opening speed or volume closes the other one.
    pub fn toggle(&mut self, panel: Panel) {
        let open = !self.is_open(panel);
        self.set(panel, open);

        if open && let Some(partner) = panel.exclusive_partner() {
            self.set(partner, false);
        }

        debug!(
            "Panel {} {}",
            panel.label(),
            if open { "opened" } else { "closed" }
        );
    }

    /// Raw flag, regardless of whether the toolbar is showing
    pub fn is_open(&self, panel: Panel) -> bool {
        match panel {
            Panel::Toolbar => self.toolbar,
            Panel::Speed => self.speed,
            Panel::Volume => self.volume,
            Panel::TimeRatio => self.time_ratio,
        }
    }

    /// Whether the panel is actually on screen
    pub fn is_shown(&self, panel: Panel) -> bool {
        match panel {
            Panel::Toolbar => self.toolbar,
            _ => self.toolbar && self.is_open(panel),
        }
    }

    /// The loop, seek, speed, volume and time toggles live in the toolbar
    pub fn toggle_buttons_shown(&self) -> bool {
        self.toolbar
    }

    /// Toggle buttons are highlighted while their panel is open
    pub fn is_highlighted(&self, panel: Panel) -> bool {
        self.is_open(panel)
    }

    fn set(&mut self, panel: Panel, open: bool) {
        match panel {
            Panel::Toolbar => self.toolbar = open,
            Panel::Speed => self.speed = open,
            Panel::Volume => self.volume = open,
            Panel::TimeRatio => self.time_ratio = open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_all_hidden() {
        let panels = PanelVisibility::new();
        for panel in [Panel::Toolbar, Panel::Speed, Panel::Volume, Panel::TimeRatio] {
            assert!(!panels.is_open(panel));
            assert!(!panels.is_shown(panel));
        }
        assert!(!panels.toggle_buttons_shown());
    }

    #[test]
    fn test_toggle_flips() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::TimeRatio);
        assert!(panels.is_open(Panel::TimeRatio));
        panels.toggle(Panel::TimeRatio);
        assert!(!panels.is_open(Panel::TimeRatio));
    }

    #[test]
    fn test_speed_closes_volume() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::Volume);
        panels.toggle(Panel::Speed);

        assert!(panels.is_open(Panel::Speed));
        assert!(!panels.is_open(Panel::Volume));
    }

    #[test]
    fn test_volume_closes_speed() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::Speed);
        panels.toggle(Panel::Volume);

        assert!(panels.is_open(Panel::Volume));
        assert!(!panels.is_open(Panel::Speed));
    }

    #[test]
    fn test_closing_speed_leaves_volume_closed() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::Speed);
        panels.toggle(Panel::Speed);

        assert!(!panels.is_open(Panel::Speed));
        assert!(!panels.is_open(Panel::Volume));
    }

    #[test]
    fn test_time_ratio_is_independent() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::Speed);
        panels.toggle(Panel::TimeRatio);

        assert!(panels.is_open(Panel::Speed));
        assert!(panels.is_open(Panel::TimeRatio));
    }

    #[test]
    fn test_toolbar_close_keeps_sub_panels() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::Toolbar);
        panels.toggle(Panel::Speed);
        assert!(panels.is_shown(Panel::Speed));

        panels.toggle(Panel::Toolbar);
        assert!(panels.is_open(Panel::Speed));
        assert!(!panels.is_open(Panel::Volume));
        assert!(!panels.is_shown(Panel::Speed));

        panels.toggle(Panel::Toolbar);
        assert!(panels.is_shown(Panel::Speed));
    }

    #[test]
    fn test_highlight_follows_flag() {
        let mut panels = PanelVisibility::new();
        panels.toggle(Panel::Volume);
        assert!(panels.is_highlighted(Panel::Volume));
        assert!(!panels.is_highlighted(Panel::Speed));
    }
}
