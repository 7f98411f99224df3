use std::f64::consts::PI;

use shared::session::Sector;
use yew::prelude::*;

const SIZE: f64 = 500.0;
const RADIUS: f64 = 230.0;
const LABEL_RADIUS: f64 = 150.0;

const SECTOR_COLORS: [&str; 6] = [
    "#f97316", // Orange
    "#06b6d4", // Cyan
    "#8b5cf6", // Violet
    "#ec4899", // Pink
    "#22c55e", // Green
    "#eab308", // Amber
];
const USED_COLOR: &str = "#4b5563";

#[derive(Properties, PartialEq)]
pub struct WheelViewProps {
    pub sectors: Vec<Sector>,
    /// Degrees, clockwise. May exceed 360 while a spin is animating.
    pub rotation: f64,
    pub is_spinning: bool,
}

fn point(angle_deg: f64, radius: f64) -> (f64, f64) {
    let center = SIZE / 2.0;
    let rad = angle_deg * PI / 180.0;
    (center + radius * rad.cos(), center + radius * rad.sin())
}

fn sector_path(start_deg: f64, sweep_deg: f64) -> String {
    let center = SIZE / 2.0;
    if sweep_deg >= 360.0 {
        // A single sector is a full disc; an arc cannot start and end on the same point
        return format!(
            "M {c} {top} A {r} {r} 0 1 1 {c} {bottom} A {r} {r} 0 1 1 {c} {top} Z",
            c = center,
            r = RADIUS,
            top = center - RADIUS,
            bottom = center + RADIUS,
        );
    }
    let (x1, y1) = point(start_deg, RADIUS);
    let (x2, y2) = point(start_deg + sweep_deg, RADIUS);
    let large_arc = if sweep_deg > 180.0 { 1 } else { 0 };
    format!(
        "M {c} {c} L {x1} {y1} A {r} {r} 0 {large_arc} 1 {x2} {y2} Z",
        c = center,
        r = RADIUS,
    )
}

#[function_component(WheelView)]
pub fn wheel_view(props: &WheelViewProps) -> Html {
    let center = SIZE / 2.0;
    let count = props.sectors.len();

    if count == 0 {
        return html! {
            <div class="flex items-center justify-center h-64 text-gray-500 dark:text-gray-400">
                { "Loading tasks..." }
            </div>
        };
    }

    let sweep = 360.0 / count as f64;
    let slices = props.sectors.iter().map(|sector| {
        let start = sector.index as f64 * sweep;
        let mid = start + sweep / 2.0;
        let (lx, ly) = point(mid, LABEL_RADIUS);
        let fill = if sector.used {
            USED_COLOR
        } else {
            SECTOR_COLORS[sector.index % SECTOR_COLORS.len()]
        };
        html! {
            <g key={sector.index}>
                <path
                    d={sector_path(start, sweep)}
                    fill={fill}
                    stroke="#ffffff"
                    stroke-width="2"
                    opacity={if sector.used { "0.6" } else { "1" }}
                />
                <text
                    x={lx.to_string()}
                    y={ly.to_string()}
                    transform={format!("rotate({} {} {})", mid, lx, ly)}
                    text-anchor="middle"
                    dominant-baseline="middle"
                    fill="#ffffff"
                    font-size="14"
                    font-weight="bold"
                    text-decoration={if sector.used { "line-through" } else { "none" }}
                >
                    { &sector.label }
                </text>
            </g>
        }
    });

    html! {
        <div class="relative w-full max-w-lg mx-auto">
            <svg viewBox={format!("0 0 {} {}", SIZE, SIZE)} class="w-full h-auto">
                <circle
                    cx={center.to_string()}
                    cy={center.to_string()}
                    r={(RADIUS + 12.0).to_string()}
                    fill={if props.is_spinning { "rgba(255, 215, 130, 0.35)" } else { "rgba(100, 130, 255, 0.15)" }}
                />
                <g transform={format!("rotate({} {} {})", props.rotation, center, center)}>
                    { for slices }
                </g>
                <circle cx={center.to_string()} cy={center.to_string()} r="18" fill="#1f2937" stroke="#ffffff" stroke-width="3" />
                // Pointer at the top, where the landed sector is read
                <polygon
                    points={format!("{},{} {},{} {},{}", center - 14.0, 2.0, center + 14.0, 2.0, center, 34.0)}
                    fill="#ef4444"
                    stroke="#ffffff"
                    stroke-width="2"
                />
            </svg>
        </div>
    }
}
